#![allow(dead_code)]

use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{http::StatusCode, routing::get, Router};
use chart_client::{files::ChartMetadata, ChartClient, ExtractLimits, FetchLimits};
use chart_templater::{web, LoadedChart, Pipeline, RenderEngine, RenderError, RenderSettings};
use flate2::{write::GzEncoder, Compression};
use serde_json::{Map, Value};
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;

pub const CHART_YAML: &str = "apiVersion: v2\nname: foo\nversion: 1.0.0\n";
pub const VALUES_YAML: &str = "replicas: 1\nimage:\n  tag: latest\n";

/// Renders every file below `templates/` in name order, followed by a line
/// describing the release and the override values.
#[derive(Debug, Default)]
pub struct FakeEngine;

#[async_trait]
impl RenderEngine for FakeEngine {
    async fn load_chart(&self, dir: &Path) -> Result<LoadedChart, RenderError> {
        let metadata = ChartMetadata::from_chart_dir(dir)?;
        Ok(LoadedChart {
            dir: dir.to_path_buf(),
            metadata,
        })
    }

    async fn render(
        &self,
        chart: &LoadedChart,
        settings: &RenderSettings,
        values: &Map<String, Value>,
    ) -> Result<String, RenderError> {
        if chart.metadata.name == "broken" {
            return Err(RenderError::Failed(
                "template: broken/templates/cm.yaml:1: unexpected EOF".to_string(),
            ));
        }
        let mut names: Vec<String> = fs::read_dir(chart.dir.join("templates"))
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();

        let mut out = String::new();
        for name in names {
            let content = fs::read_to_string(chart.dir.join("templates").join(&name)).unwrap();
            out.push_str(&format!(
                "---\n# Source: {}/templates/{}\n{}",
                chart.metadata.name, name, content
            ));
        }
        out.push_str(&format!(
            "# release={} namespace={} values={}\n",
            settings.release_name,
            settings.namespace,
            serde_json::to_string(values).unwrap()
        ));
        Ok(out)
    }
}

pub enum Item<'a> {
    Dir(&'a str),
    File(&'a str, &'a str),
}

/// Gzipped tarball with names written verbatim into the header.
pub fn tarball(items: &[Item<'_>]) -> Vec<u8> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for item in items {
        let mut header = Header::new_gnu();
        let (name, data) = match item {
            Item::Dir(name) => {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
                (*name, "")
            }
            Item::File(name, data) => {
                header.set_entry_type(EntryType::Regular);
                header.set_mode(0o644);
                (*name, *data)
            }
        };
        let raw_name = &mut header.as_old_mut().name;
        raw_name.fill(0);
        raw_name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(data.len() as u64);
        header.set_mtime(0);
        header.set_cksum();
        builder.append(&header, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn foo_chart() -> Vec<u8> {
    tarball(&[
        Item::Dir("foo/"),
        Item::File("foo/Chart.yaml", CHART_YAML),
        Item::File("foo/values.yaml", VALUES_YAML),
        Item::Dir("foo/templates/"),
        Item::File("foo/templates/configmap.yaml", "kind: ConfigMap\n"),
        Item::File("foo/templates/deployment.yaml", "kind: Deployment\n"),
    ])
}

fn chart_host() -> Router {
    let no_values = tarball(&[
        Item::File("bar/Chart.yaml", "apiVersion: v2\nname: bar\nversion: 0.1.0\n"),
        Item::File("bar/templates/svc.yaml", "kind: Service\n"),
    ]);
    let flat = tarball(&[
        Item::File("Chart.yaml", CHART_YAML),
        Item::File("values.yaml", VALUES_YAML),
    ]);
    let evil = tarball(&[
        Item::Dir("foo/"),
        Item::File("foo/Chart.yaml", CHART_YAML),
        Item::File("foo/../../../escaped.txt", "owned"),
    ]);
    let broken = tarball(&[
        Item::File("broken/Chart.yaml", "apiVersion: v2\nname: broken\nversion: 0.1.0\n"),
        Item::File("broken/templates/cm.yaml", "{{"),
    ]);
    let foo = foo_chart();
    Router::new()
        .route("/charts/foo-1.0.0.tgz", get(move || async move { foo }))
        .route("/charts/bar-0.1.0.tgz", get(move || async move { no_values }))
        .route("/charts/flat-1.0.0.tgz", get(move || async move { flat }))
        .route("/charts/evil-1.0.0.tgz", get(move || async move { evil }))
        .route("/charts/broken-0.1.0.tgz", get(move || async move { broken }))
        .route(
            "/charts/garbage-1.0.0.tgz",
            get(|| async { "definitely not gzip" }),
        )
        .route(
            "/charts/private-1.0.0.tgz",
            get(|| async { (StatusCode::FORBIDDEN, "forbidden") }),
        )
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });
    addr
}

pub struct TestService {
    pub addr: SocketAddr,
    pub charts: SocketAddr,
    pub scratch: TempDir,
    pub assets: TempDir,
    pub http: reqwest::Client,
}

impl TestService {
    pub async fn start() -> Self {
        Self::start_with(FetchLimits::default(), ExtractLimits::default()).await
    }

    pub async fn start_with(fetch: FetchLimits, extract: ExtractLimits) -> Self {
        let charts = serve(chart_host()).await;
        let scratch = tempfile::tempdir().expect("scratch dir");
        let assets = tempfile::tempdir().expect("assets dir");
        fs::write(assets.path().join("index.html"), "<html>chart templater</html>")
            .expect("write index");

        let client =
            ChartClient::new(Some(scratch.path().to_path_buf()), fetch).expect("chart client");
        let pipeline = Arc::new(Pipeline::new(
            client,
            Arc::new(FakeEngine),
            RenderSettings::default(),
            extract,
        ));
        let addr = serve(web::router(pipeline, assets.path())).await;

        TestService {
            addr,
            charts,
            scratch,
            assets,
            http: reqwest::Client::new(),
        }
    }

    pub fn chart_url(&self, name: &str) -> String {
        format!("http://{}/charts/{}", self.charts, name)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        fs::read_dir(self.scratch.path())
            .expect("read scratch dir")
            .map(|e| e.expect("scratch entry").path())
            .collect()
    }
}
