//! Per-request context handed to handlers.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BodyError, ResponseError};
use crate::pattern::Params;
use crate::request::{Form, Request};
use crate::response::ResponseWriter;
use crate::types::HttpMethod;

/// One request, its route parameters and the response being framed.
///
/// A context is created by the dispatcher for exactly one connection and
/// dropped when that connection is done; nothing in it is shared.
#[derive(Debug)]
pub struct Context<'a> {
    request: Request,
    params: Params,
    response: ResponseWriter<'a>,
}

impl<'a> Context<'a> {
    pub fn new(request: Request, params: Params, response: ResponseWriter<'a>) -> Self {
        Self {
            request,
            params,
            response,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn response(&self) -> &ResponseWriter<'a> {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter<'a> {
        &mut self.response
    }

    // ----- request side ---------------------------------------------------

    pub fn method(&self) -> &HttpMethod {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// Value captured for route parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn host(&self) -> &str {
        self.request.host()
    }

    pub fn user_agent(&self) -> &str {
        self.request.user_agent()
    }

    pub fn accept(&self) -> &str {
        self.request.accept()
    }

    pub fn platform(&self) -> &str {
        self.request.platform()
    }

    pub fn parse_json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        self.request.json()
    }

    pub fn parse_form(&mut self) -> Result<Form, BodyError> {
        self.request.form()
    }

    // ----- response side --------------------------------------------------

    pub fn set_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ResponseError> {
        self.response.set_header(name, value)
    }

    pub fn text(&mut self, status: u16, body: impl AsRef<str>) -> Result<(), ResponseError> {
        self.response.text(status, body)
    }

    pub fn html(&mut self, status: u16, body: impl AsRef<str>) -> Result<(), ResponseError> {
        self.response.html(status, body)
    }

    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: u16,
        value: &T,
    ) -> Result<(), ResponseError> {
        self.response.json(status, value)
    }

    pub fn file(&mut self, status: u16, path: impl AsRef<Path>) -> Result<(), ResponseError> {
        self.response.file(status, path)
    }

    pub fn not_found(&mut self) -> Result<(), ResponseError> {
        self.response.not_found()
    }

    pub fn redirect(&mut self, location: impl Into<String>) -> Result<(), ResponseError> {
        self.response.redirect(location)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ResponseError> {
        self.response.write(bytes)
    }

    /// Bypass framing entirely; see [`ResponseWriter::write_raw`].
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), ResponseError> {
        self.response.write_raw(bytes)
    }
}
