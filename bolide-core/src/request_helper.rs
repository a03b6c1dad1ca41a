use std::borrow::Cow;

use axum::{
    headers::{ContentType, HeaderMapExt},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use sqlx::{pool::PoolConnection, Postgres};

use crate::{error::BolideError, session::SessionMode, state::BolideRequestState};

pub type DbRef = PoolConnection<Postgres>;

#[derive(serde::Deserialize, Copy, Clone, PartialEq, Eq, Debug)]
pub enum FormMethod {
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "update")]
    Update,
}

impl ToString for FormMethod {
    fn to_string(&self) -> String {
        use FormMethod::*;
        match self {
            Delete => "delete",
            Create => "create",
            Update => "update",
        }
        .to_string()
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct ApiFormData<T: std::fmt::Debug> {
    #[serde(rename = "_csrf_token")]
    csrf_token: String,
    #[serde(rename = "_method")]
    method: Option<FormMethod>,
    #[serde(flatten, bound(deserialize = "T: serde::Deserialize<'de>"))]
    pub data: T,
}

#[derive(serde::Deserialize, Debug)]
pub struct ApiFormDataEmpty {
    #[serde(rename = "_csrf_token")]
    csrf_token: String,
    #[serde(rename = "_method")]
    method: Option<FormMethod>,
}

impl ApiFormDataEmpty {
    pub fn into_afd(&self) -> ApiFormData<()> {
        ApiFormData {
            csrf_token: self.csrf_token.clone(),
            method: self.method,
            data: (),
        }
    }
}

impl<T: std::fmt::Debug> ApiFormData<T> {
    pub fn verify_csrf<R: SessionMode>(
        &self,
        method: Option<FormMethod>,
        rstate: &BolideRequestState<R>,
    ) -> bool {
        // verify method expected == method gotten
        if method != self.method {
            false
        } else {
            rstate.session().verify_csrf(&self.csrf_token)
        }
    }
    pub fn method(&self) -> Option<FormMethod> {
        self.method
    }
}

pub enum BolideResponse<T: IntoResponse> {
    Html(HtmlResponse),
    File(FileResponse),
    Redirect(Redirect),
    Error(BolideError),
    Other(T),
}

impl<T> IntoResponse for BolideResponse<T>
where
    T: IntoResponse,
{
    fn into_response(self) -> axum::response::Response {
        match self {
            BolideResponse::Html(h) => h.into_response(),
            BolideResponse::File(f) => f.into_response(),
            BolideResponse::Redirect(r) => r.into_response(),
            BolideResponse::Error(e) => e.into_response(),
            BolideResponse::Other(v) => v.into_response(),
        }
    }
}

pub struct HtmlResponse {
    pub content: String,
}

impl IntoResponse for HtmlResponse {
    fn into_response(self) -> axum::response::Response {
        let mut hm = HeaderMap::new();
        hm.typed_insert(ContentType::html());
        (hm, self.content).into_response()
    }
}

impl From<String> for HtmlResponse {
    fn from(s: String) -> Self {
        Self { content: s }
    }
}

impl From<maud::PreEscaped<String>> for HtmlResponse {
    fn from(s: maud::PreEscaped<String>) -> Self {
        Self { content: s.0 }
    }
}

pub struct FileResponse {
    pub content: Cow<'static, [u8]>,
    pub headers: HeaderMap,
}

impl IntoResponse for FileResponse {
    fn into_response(self) -> axum::response::Response {
        (self.headers, self.content).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bolide_dependencies::serde_urlencoded;

    #[test]
    fn form_data_decodes_hidden_fields() {
        let afd: ApiFormDataEmpty =
            serde_urlencoded::from_str("_csrf_token=abcdef&_method=create").unwrap();
        assert_eq!(afd.method, Some(FormMethod::Create));
        assert_eq!(afd.into_afd().method(), Some(FormMethod::Create));
        assert_eq!(afd.csrf_token, "abcdef");
    }

    #[test]
    fn form_data_keeps_the_payload() {
        #[derive(serde::Deserialize, Debug)]
        struct Probe {
            q: String,
        }
        let afd: ApiFormData<Probe> =
            serde_urlencoded::from_str("_csrf_token=tok&_method=update&q=rust").unwrap();
        assert_eq!(afd.data.q, "rust");
        assert_eq!(afd.method(), Some(FormMethod::Update));
    }
}
