// ============================================================================
// Inpaint operation — the single linear sequence behind the "IOPaint" action
// ============================================================================
//
// validate selection → compute rects → extract buffers → call service →
// composite and merge.  No retries, no state machine, and no document
// mutation until the service has answered successfully.

use std::time::Instant;

use crate::canvas::Rect;
use crate::client::InpaintClient;
use crate::host::DocumentHost;
use crate::ops::composite;
use crate::ops::region::{self, RegionPayload};
use crate::{log_err, log_info, log_warn};

/// Errors that can occur during an inpaint run.
#[derive(Debug)]
pub enum InpaintError {
    NoActiveLayer,
    Encode(String),
    Connection(String),
    Status(u16),
    BadResponse(String),
    DimensionMismatch {
        expected: (u32, u32),
        got: (u32, u32),
    },
    WriteBack(String),
}

impl std::fmt::Display for InpaintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InpaintError::NoActiveLayer => write!(f, "document has no active layer"),
            InpaintError::Encode(e) => write!(f, "failed to encode request payload: {}", e),
            InpaintError::Connection(e) => write!(f, "connection to inpaint server failed: {}", e),
            InpaintError::Status(code) => write!(f, "inpaint server returned HTTP {}", code),
            InpaintError::BadResponse(e) => write!(f, "unusable inpaint response: {}", e),
            InpaintError::DimensionMismatch { expected, got } => write!(
                f,
                "response is {}×{}, expected {}×{}",
                got.0, got.1, expected.0, expected.1
            ),
            InpaintError::WriteBack(e) => write!(f, "failed to write result to layer: {}", e),
        }
    }
}

/// How a run ended when it did not hard-fail.
#[derive(Debug, PartialEq, Eq)]
pub enum InpaintOutcome {
    /// The service response was merged onto the active layer; `region` is
    /// the padded rect that changed.
    Applied { region: Rect },
    /// Nothing selected (or the selection misses the layer entirely).
    /// A warning was shown; no request was sent.
    NoSelection,
    /// The server could not be reached.  A warning was shown; the document
    /// is untouched.
    ServerUnreachable,
}

pub struct InpaintSettings {
    /// Context pixels included around the selection.
    pub margin: u32,
}

impl Default for InpaintSettings {
    fn default() -> Self {
        Self { margin: region::PAD }
    }
}

/// Run the inpaint operation against `host` using `client`.
///
/// Soft exits (no selection, unreachable server) surface an inline warning
/// on the host and come back as an [`InpaintOutcome`]; everything else is an
/// [`InpaintError`] and leaves the document unmodified.
pub fn run(
    host: &mut dyn DocumentHost,
    client: &InpaintClient,
    settings: &InpaintSettings,
) -> Result<InpaintOutcome, InpaintError> {
    let layer_bounds = host.layer_bounds().ok_or(InpaintError::NoActiveLayer)?;

    let Some(sel) = host.selection_bounds() else {
        host.show_warning("IOPaint requires a selection");
        return Ok(InpaintOutcome::NoSelection);
    };

    // Selection bounds are in document coordinates; the pixel store works in
    // layer-local coordinates.
    let (pos_x, pos_y) = host.layer_position();
    let sel_local = sel.translate(-pos_x, -pos_y);

    let (coords, pcoords) = region::padded_region(sel_local, layer_bounds, settings.margin);
    if coords.is_empty() {
        log_warn!("selection {:?} does not overlap the active layer", sel);
        host.show_warning("IOPaint: the selection does not overlap the active layer");
        return Ok(InpaintOutcome::NoSelection);
    }
    log_info!(
        "inpaint: selection {:?} → region {:?} (margin {})",
        coords,
        pcoords,
        settings.margin
    );

    let (pw, ph) = pcoords.size();
    let image_bgra = host.read_pixels(pcoords);
    let mask = host.read_mask(pcoords);
    let payload = RegionPayload::encode(&image_bgra, &mask, pw, ph)?;

    let started = Instant::now();
    let response_png = match client.inpaint(&payload) {
        Ok(bytes) => bytes,
        Err(InpaintError::Connection(e)) => {
            log_warn!("inpaint server unreachable: {}", e);
            host.show_warning(&format!(
                "Could not connect to IOPaint server at {} – is it running?",
                client.authority()
            ));
            return Ok(InpaintOutcome::ServerUnreachable);
        }
        Err(e) => {
            log_err!("inpaint request failed: {}", e);
            return Err(e);
        }
    };
    log_info!(
        "inpaint: {} response bytes in {:.0}ms",
        response_png.len(),
        started.elapsed().as_secs_f64() * 1000.0
    );

    let mut result = composite::decode_response(&response_png, pw, ph)?;
    composite::apply_mask(&mut result, &mask);
    composite::write_back(host, pcoords, &result)?;

    Ok(InpaintOutcome::Applied { region: pcoords })
}
