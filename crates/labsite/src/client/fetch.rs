use crate::errors::FetchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP GET. Implementations report non-2xx answers as a response, not as an error; errors are for requests
/// that got no answer at all.
pub trait Fetch: Send + Sync + 'static {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// [`Fetch`] over HTTP with `ureq`'s default agent settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqFetcher;

impl Fetch for UreqFetcher {
    fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let transport_error = |err: ureq::Error| FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = match ureq::get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Ok(FetchResponse {
                    status,
                    body: String::new(),
                });
            }
            Err(err) => return Err(transport_error(err)),
        };

        let status = response.status().as_u16();
        let (_, mut body) = response.into_parts();
        let body = body.read_to_string().map_err(transport_error)?;

        Ok(FetchResponse { status, body })
    }
}
