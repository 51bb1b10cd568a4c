// ============================================================================
// End-to-end pipeline tests against a stub inpaint server
// ============================================================================
//
// Each test drives the full operation (selection → region math → HTTP →
// composite → merge) against an in-memory document and a canned one-shot
// HTTP responder on a loopback port.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba};

use iopaint::ops::inpaint::{self, InpaintError, InpaintOutcome, InpaintSettings};
use iopaint::{Document, InpaintClient, Rect};

// ---- stub server -----------------------------------------------------------

struct StubServer {
    authority: String,
    request_rx: mpsc::Receiver<String>,
}

/// Accept exactly one connection, hand the request body to the test, and
/// answer with a canned response.
fn spawn_stub(status_line: &'static str, body: Vec<u8>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let authority = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    let (tx, request_rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let request_body = read_request_body(&mut stream);
            let _ = tx.send(request_body);
            let _ = write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            let _ = stream.write_all(&body);
        }
    });
    StubServer {
        authority,
        request_rx,
    }
}

/// Read headers up to the blank line, then exactly Content-Length body bytes.
fn read_request_body(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).unwrap_or(0) == 0 {
            break;
        }
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head);
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    let _ = stream.read_exact(&mut body);
    String::from_utf8_lossy(&body).into_owned()
}

/// A loopback authority with nothing listening on it.
fn dead_authority() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let authority = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
    drop(listener);
    authority
}

fn png_rgba_fill(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let pixels: Vec<u8> = px
        .iter()
        .copied()
        .cycle()
        .take(w as usize * h as usize * 4)
        .collect();
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(&pixels, w, h, ColorType::Rgba8)
        .unwrap();
    out
}

fn red_document(w: u32, h: u32) -> Document {
    let mut doc = Document::new(w, h);
    for px in doc.layers[0].pixels.pixels_mut() {
        *px = Rgba([255, 0, 0, 255]);
    }
    doc
}

// ---- tests -----------------------------------------------------------------

#[test]
fn no_selection_sends_nothing_and_warns() {
    // The client points at a dead port: any attempted request would show up
    // as ServerUnreachable instead of NoSelection.
    let mut doc = red_document(32, 32);
    let client = InpaintClient::new(dead_authority());

    let outcome = inpaint::run(&mut doc, &client, &InpaintSettings::default()).unwrap();

    assert_eq!(outcome, InpaintOutcome::NoSelection);
    assert!(
        doc.messages
            .iter()
            .any(|m| m.contains("requires a selection"))
    );
}

#[test]
fn unreachable_server_warns_and_leaves_document_untouched() {
    let mut doc = red_document(32, 32);
    doc.select_rect(Rect::new(10, 10, 4, 4));
    let authority = dead_authority();
    let client = InpaintClient::new(authority.clone());

    let outcome = inpaint::run(&mut doc, &client, &InpaintSettings::default()).unwrap();

    assert_eq!(outcome, InpaintOutcome::ServerUnreachable);
    assert!(doc.messages.iter().any(|m| m.contains(&authority)));
    assert_eq!(doc.layers.len(), 1);
    assert_eq!(*doc.layers[0].pixels.get_pixel(11, 11), Rgba([255, 0, 0, 255]));
}

#[test]
fn http_500_aborts_without_mutating_the_document() {
    let stub = spawn_stub("500 Internal Server Error", Vec::new());
    let mut doc = red_document(32, 32);
    doc.select_rect(Rect::new(10, 10, 4, 4));
    let client = InpaintClient::new(stub.authority.clone());

    let err = inpaint::run(&mut doc, &client, &InpaintSettings { margin: 4 }).unwrap_err();

    assert!(matches!(err, InpaintError::Status(500)));
    assert_eq!(doc.layers.len(), 1);
    for px in doc.layers[0].pixels.pixels() {
        assert_eq!(*px, Rgba([255, 0, 0, 255]));
    }
}

#[test]
fn wrong_sized_response_is_rejected_before_any_merge() {
    // Padded region is 12×12, response is 5×5
    let stub = spawn_stub("200 OK", png_rgba_fill(5, 5, [0, 0, 255, 255]));
    let mut doc = red_document(32, 32);
    doc.select_rect(Rect::new(10, 10, 4, 4));
    let client = InpaintClient::new(stub.authority.clone());

    let err = inpaint::run(&mut doc, &client, &InpaintSettings { margin: 4 }).unwrap_err();

    assert!(matches!(err, InpaintError::DimensionMismatch { .. }));
    assert_eq!(doc.layers.len(), 1);
    assert_eq!(*doc.layers[0].pixels.get_pixel(11, 11), Rgba([255, 0, 0, 255]));
}

#[test]
fn successful_response_merges_through_the_mask() {
    // Selection (20,16)–(27,23) with margin 4 → padded region (16,12) 16×16
    let stub = spawn_stub("200 OK", png_rgba_fill(16, 16, [0, 0, 255, 255]));
    let mut doc = red_document(64, 48);
    doc.select_rect(Rect::new(20, 16, 8, 8));
    let client = InpaintClient::new(stub.authority.clone());

    let outcome = inpaint::run(&mut doc, &client, &InpaintSettings { margin: 4 }).unwrap();

    assert_eq!(
        outcome,
        InpaintOutcome::Applied {
            region: Rect::new(16, 12, 16, 16)
        }
    );
    // The duplicate was merged back down
    assert_eq!(doc.layers.len(), 1);

    let pixels = &doc.layers[0].pixels;
    // Inside the selection: response pixels, fully opaque
    assert_eq!(*pixels.get_pixel(24, 20), Rgba([0, 0, 255, 255]));
    assert_eq!(*pixels.get_pixel(20, 16), Rgba([0, 0, 255, 255]));
    // Inside the padded context but outside the selection: mask is 0, so the
    // response pixel is fully transparent and the original survives
    assert_eq!(*pixels.get_pixel(17, 13), Rgba([255, 0, 0, 255]));
    // Far outside the padded region: untouched
    assert_eq!(*pixels.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    assert_eq!(*pixels.get_pixel(63, 47), Rgba([255, 0, 0, 255]));

    // The request carried both payloads as PNG data URLs of the padded size
    let body = stub.request_rx.recv().unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let prefix = "data:image/png;base64,";

    let image_url = json["image"].as_str().unwrap();
    assert!(image_url.starts_with(prefix));
    let image_png = BASE64.decode(&image_url[prefix.len()..]).unwrap();
    let image = image::load_from_memory(&image_png).unwrap().into_rgba8();
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);

    let mask_url = json["mask"].as_str().unwrap();
    assert!(mask_url.starts_with(prefix));
    let mask_png = BASE64.decode(&mask_url[prefix.len()..]).unwrap();
    let mask = image::load_from_memory(&mask_png).unwrap().into_luma8();
    assert_eq!(mask.dimensions(), (16, 16));
    // Document (20,16) is local (4,4) inside the padded region
    assert_eq!(mask.get_pixel(4, 4).0, [255]);
    assert_eq!(mask.get_pixel(0, 0).0, [0]);
}
