use anyhow::Context;
use axum::{
    headers::{ContentType, HeaderMapExt},
    http::HeaderMap,
    response::Redirect,
    Router,
};
use axum_extra::routing::{RouterExt, TypedPath};
use bolide_dependencies::{mime, new_mime_guess, rust_embed};

use crate::config::Configuration;
use crate::error::{BolideError, BolideResult};
use crate::footer::FooterData;
use crate::request_helper::FileResponse;
use crate::state::BolideState;

#[derive(rust_embed::RustEmbed)]
#[folder = "../res/assets-build/"]
#[prefix = "/static/"]
pub struct Assets;

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/favicon.ico")]
pub struct PathFaviconIco {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/favicon.svg")]
pub struct PathFaviconSvg {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/robots.txt")]
pub struct PathRobots {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/static/*path")]
pub struct PathStaticAsset {
    pub path: String,
}

pub async fn serve_favicon_ico(_: PathFaviconIco) -> Redirect {
    Redirect::permanent("/favicon.svg")
}

pub async fn serve_favicon_svg(_: PathFaviconSvg) -> BolideResult<FileResponse> {
    serve_static_file("favicon.svg").await
}

pub async fn serve_robots(_: PathRobots) -> BolideResult<FileResponse> {
    serve_static_file("robots.txt").await
}

pub async fn serve_asset(PathStaticAsset { path }: PathStaticAsset) -> BolideResult<FileResponse> {
    serve_static_file(&path).await
}

pub fn embedded_file_pages(r: Router<BolideState>) -> Router<BolideState> {
    r.typed_get(serve_favicon_ico)
        .typed_get(serve_favicon_svg)
        .typed_get(serve_robots)
        .typed_get(serve_asset)
}

pub async fn serve_static_file(file: &str) -> BolideResult<FileResponse> {
    let path = if file.starts_with("/static/") {
        file.to_string()
    } else {
        format!("/static/{}", file.trim_start_matches('/'))
    };
    match Assets::get(&path) {
        None => Err(BolideError::PageNotFound(path)),
        Some(file) => {
            let ext = std::path::Path::new(&path)
                .extension()
                .unwrap_or_default()
                .to_string_lossy();
            let content_type = new_mime_guess::from_ext(&ext)
                .first()
                .unwrap_or(mime::TEXT_PLAIN);
            trace!("Serving static file {} with content type {}", path, content_type);
            let mut headers = HeaderMap::new();
            headers.typed_insert(ContentType::from(content_type));
            Ok(FileResponse {
                content: file.data,
                headers,
            })
        }
    }
}

#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct SiteConfig {
    name: String,
    source_repo: String,
    source_name: String,
}

impl SiteConfig {
    pub fn site_name(&self) -> &String {
        &self.name
    }
    pub fn source_repo(&self) -> &String {
        &self.source_repo
    }
    pub fn source_name(&self) -> &String {
        &self.source_name
    }
}

#[derive(Clone, Debug, Default)]
pub struct AssetLoader {
    data: FooterData,
    siteconf: SiteConfig,
}

impl AssetLoader {
    pub fn new(c: &Configuration) -> BolideResult<Self> {
        tracing::info!("Configuring Assets");
        let dataroot = std::path::PathBuf::from(&c.static_root);
        if !dataroot.exists() {
            tracing::error!("COULD NOT FIND ASSETS ON DISK");
            return Ok(Self::default());
        }
        tracing::debug!("Data root for static assets is {}", dataroot.display());
        let mut data = dataroot.clone();
        data.push("footer.json");
        let data = std::fs::File::open(data).context("Could not find footer data")?;
        let data: FooterData =
            serde_json::from_reader(data).context("Could not parse Footer Data")?;
        let mut siteconf = dataroot;
        siteconf.push("site-conf.json");
        let siteconf = std::fs::File::open(siteconf).context("Could not find site config data")?;
        let siteconf: SiteConfig =
            serde_json::from_reader(siteconf).context("Could not parse site config data")?;
        Ok(Self { data, siteconf })
    }
    pub fn footer_data(&self) -> &FooterData {
        &self.data
    }
    pub fn site_config(&self) -> &SiteConfig {
        &self.siteconf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn embedded_stylesheet_is_served_as_css() {
        let res = serve_static_file("app.css").await.unwrap();
        assert!(!res.content.is_empty());
        let ct = res.headers.typed_get::<ContentType>().unwrap();
        assert_eq!(ct, ContentType::from(mime::TEXT_CSS));
    }

    #[tokio::test]
    async fn missing_assets_are_not_found() {
        let err = serve_static_file("no-such-file.bin").await;
        assert!(matches!(err, Err(BolideError::PageNotFound(_))));
    }
}
