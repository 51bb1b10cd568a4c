// ============================================================================
// Inpaint service client — one synchronous POST per run
// ============================================================================
//
// The service is a black box: JSON in (base64 PNG image + mask), raw PNG
// bytes out.  The client is request-scoped — constructed per run by the
// caller, never stored in a global.

use std::io::Read;

use serde::Serialize;

use crate::ops::inpaint::InpaintError;
use crate::ops::region::RegionPayload;

/// Default address of a locally running IOPaint server.
pub const DEFAULT_AUTHORITY: &str = "127.0.0.1:8080";

#[derive(Serialize)]
struct InpaintRequest<'a> {
    image: &'a str,
    mask: &'a str,
}

pub struct InpaintClient {
    authority: String,
    agent: ureq::Agent,
}

impl InpaintClient {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// `host:port` of the server, as shown in user-facing messages.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/api/v1/inpaint", self.authority)
    }

    /// POST the payload and return the raw PNG bytes of a 2xx response.
    ///
    /// Blocks the calling thread until the server answers or the connection
    /// fails; no retry, no configured timeout.
    pub fn inpaint(&self, payload: &RegionPayload) -> Result<Vec<u8>, InpaintError> {
        let request = InpaintRequest {
            image: &payload.image,
            mask: &payload.mask,
        };
        let response = self
            .agent
            .post(&self.endpoint())
            .send_json(request)
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => InpaintError::Status(code),
                ureq::Error::Transport(t) => InpaintError::Connection(t.to_string()),
            })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| InpaintError::BadResponse(e.to_string()))?;
        Ok(bytes)
    }
}
