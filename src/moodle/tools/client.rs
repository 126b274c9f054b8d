use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::moodle::tools::error::{RemoteApiError, Result, ToolError};
use crate::moodle::tools::flatten::{FlatParameters, flatten};
use crate::moodle::tools::response::Response;

/// REST endpoint of the school's Moodle site.
pub const DEFAULT_URL: &str = "https://moodle.gymnasedebeaulieu.ch/webservice/rest/server.php";

const TOKEN_FIELD: &str = "wstoken";
const FORMAT_FIELD: &str = "moodlewsrestformat";
const FUNCTION_FIELD: &str = "wsfunction";
const JSON_FORMAT: &str = "json";

/// Sends a form-encoded POST and returns the raw response body.
///
/// Any failure to complete the exchange must surface as
/// [`ToolError::Transport`]. The status code is not part of the contract.
pub trait Transport {
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String>;
}

/// Blocking HTTP transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(ToolError::transport)?;
        debug!(status = %response.status(), "received Moodle response");
        response.text().map_err(ToolError::transport)
    }
}

/// Client for Moodle's REST web service protocol.
///
/// Every call is a single POST; nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct MoodleClient<T = HttpTransport> {
    url: String,
    token: String,
    transport: T,
}

impl MoodleClient<HttpTransport> {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_transport(url, token, HttpTransport::new())
    }
}

impl<T: Transport> MoodleClient<T> {
    pub fn with_transport(url: impl Into<String>, token: impl Into<String>, transport: T) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            transport,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls the web service function `function` with named arguments.
    ///
    /// `args` must serialize to a JSON object (its fields are the argument
    /// names) or to null/unit for functions without arguments.
    ///
    /// ```no_run
    /// # use moodle_tools::client::MoodleClient;
    /// # use serde_json::json;
    /// let moodle = MoodleClient::new("https://example.org/webservice/rest/server.php", "token");
    /// moodle.call(
    ///     "core_course_update_courses",
    ///     &json!({"courses": [{"id": 1, "fullname": "My favorite course"}]}),
    /// )?;
    /// # Ok::<(), moodle_tools::ToolError>(())
    /// ```
    pub fn call<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> Result<Response> {
        let parameters = self.parameters(function, args)?;
        debug!(function, parameter_count = parameters.len(), "calling Moodle function");

        let body = self.transport.post_form(&self.url, &parameters.to_form_pairs())?;
        let value: Value = serde_json::from_str(&body).map_err(ToolError::Decode)?;

        if let Value::Object(map) = &value {
            if map.get("exception").is_some_and(is_truthy) {
                return Err(RemoteApiError::new(value).into());
            }
        }

        Ok(Response::new(value))
    }

    fn parameters<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> Result<FlatParameters> {
        let args = serde_json::to_value(args)
            .map_err(|error| ToolError::InvalidArguments(error.to_string()))?;
        let mut parameters = match &args {
            Value::Object(_) => flatten(&args),
            Value::Null => FlatParameters::new(),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected named arguments, got {other}"
                )));
            }
        };

        parameters.insert(TOKEN_FIELD, self.token.as_str());
        parameters.insert(FORMAT_FIELD, JSON_FORMAT);
        parameters.insert(FUNCTION_FIELD, function);
        Ok(parameters)
    }
}

/// Truthiness as Moodle clients usually test it: null, `false`, zero, and
/// empty strings or containers are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
