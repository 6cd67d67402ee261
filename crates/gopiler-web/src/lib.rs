//! gopiler-web — the HTTP front end (spec.md §6 "HTTP driver").
//!
//! A second, independent thin collaborator over the same four pipeline
//! crates `gopiler-drv` wraps for the CLI (spec.md §1). State from the
//! most recent `/compile` call is held in [`AppState`] so the `GET`
//! endpoints can retrieve it afterward; per spec.md §6 "Persisted state"
//! nothing survives past the next `/compile` call.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use gopiler_sem::SymbolTableTree;
use gopiler_util::Diagnostics;

pub use gopiler_pipeline::{compile_source, ProgramResult};

/// State shared by every handler: the artifacts of the most recent
/// `/compile` call, protected by a single lock (spec.md §5 "Shared
/// resources": "writers are serialized").
pub struct AppState {
    results: Mutex<Vec<ProgramResult>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<AppState>;

/// Builds the router for spec.md §6's endpoint table.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/compile", post(compile))
        .route("/getCST", get(get_cst))
        .route("/getAST", get(get_ast))
        .route("/getSymbolTables", get(get_symbol_tables))
        .route("/getMachineCode/:n", get(get_machine_code))
        .route("/getAssembly/:n", get(get_assembly))
        .nest_service("/static", tower_http::services::ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

const INDEX_HTML: &str = include_str!("../static/index.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
struct CompileRequest {
    code: String,
    #[serde(default)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct CompileResponse {
    output: String,
}

/// `POST /compile` (spec.md §6): compiles the posted source text, stores
/// the results for the other `GET` endpoints, and returns the drained,
/// HTML-escaped diagnostics log.
async fn compile(
    State(state): State<SharedState>,
    Json(request): Json<CompileRequest>,
) -> Json<CompileResponse> {
    let diag = Diagnostics::buffered(request.verbose);
    diag.info(
        "GOPILER",
        &format!("Starting compilation with verbose mode: {}", request.verbose),
    );

    let results = if request.code.is_empty() {
        diag.warn("GOPILER", "No code provided. No compilation will be executed.");
        Vec::new()
    } else {
        compile_source(&request.code, &diag)
    };

    diag.info("GOPILER", "All compilations complete.");
    let output = diag.drain();

    *state.results.lock() = results;
    Json(CompileResponse { output })
}

/// `GET /getCST` (spec.md §6): concatenated CST dumps, one per program
/// that reached the parser successfully.
async fn get_cst(State(state): State<SharedState>) -> String {
    let results = state.results.lock();
    render_per_program(&results, |r| {
        r.cst.as_ref().map(|cst| cst.render())
    })
}

/// `GET /getAST` (spec.md §6): concatenated AST dumps.
async fn get_ast(State(state): State<SharedState>) -> String {
    let results = state.results.lock();
    render_per_program(&results, |r| r.ast.as_ref().map(|ast| ast.render()))
}

fn render_per_program(
    results: &[ProgramResult],
    mut render: impl FnMut(&ProgramResult) -> Option<String>,
) -> String {
    if results.is_empty() {
        return "No code generated due to missing compilation.".to_string();
    }
    let mut out = String::new();
    for result in results {
        out.push_str(&format!("Program {}:\n", result.program_num));
        match render(result) {
            Some(rendered) => out.push_str(&rendered),
            None => out.push_str("No code generated due to compile error."),
        }
        out.push_str("\n\n");
    }
    out
}

/// `GET /getSymbolTables` (spec.md §6): one HTML table per program,
/// reusing `symbol_table.go`'s tab-separated column shape (spec.md
/// SPEC_FULL §2).
async fn get_symbol_tables(State(state): State<SharedState>) -> Html<String> {
    let results = state.results.lock();
    if results.is_empty() {
        return Html("<p>No code generated due to missing compilation.</p>".to_string());
    }
    let mut out = String::new();
    for result in results.iter() {
        out.push_str(&format!("<h3>Program {}</h3>\n", result.program_num));
        match &result.symbols {
            Some(symbols) => out.push_str(&symbol_table_html(symbols)),
            None => out.push_str("<p>No code generated due to compile error.</p>"),
        }
    }
    Html(out)
}

fn symbol_table_html(symbols: &SymbolTableTree) -> String {
    let mut out = String::from(
        "<table><tr><th>Scope</th><th>Name</th><th>Type</th><th>Line</th><th>StartPos</th><th>Initialized</th><th>Used</th></tr>\n",
    );
    for (scope, entry) in symbols.all_entries() {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            html_escape(symbols.id_string(scope)),
            entry.name,
            entry.ty,
            entry.loc.line,
            entry.loc.column,
            entry.initialized,
            entry.used,
        ));
    }
    out.push_str("</table>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// `GET /getMachineCode/:n` (spec.md §6): `n` is the zero-based program
/// index; hex bytes separated by spaces.
async fn get_machine_code(
    State(state): State<SharedState>,
    Path(n): Path<usize>,
) -> Result<String, StatusCode> {
    let results = state.results.lock();
    let result = results.get(n).ok_or(StatusCode::NOT_FOUND)?;
    match &result.image {
        Some(image) => Ok(image.to_hex_spaced()),
        None => Ok("No code generated due to compile error.".to_string()),
    }
}

/// `GET /getAssembly/:n` (spec.md §6): mnemonic listing for program `n`,
/// indexed correctly per DESIGN NOTES §9 ("`GetAssembly` in one
/// intermediate version returns program 0's assembly regardless of the
/// requested index; treat this as a bug").
async fn get_assembly(
    State(state): State<SharedState>,
    Path(n): Path<usize>,
) -> Result<String, StatusCode> {
    let results = state.results.lock();
    let result = results.get(n).ok_or(StatusCode::NOT_FOUND)?;
    match &result.assembly {
        Some(asm) => Ok(asm.clone()),
        None => Ok("No code generated due to compile error.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        router(Arc::new(AppState::new()))
    }

    #[tokio::test]
    async fn index_serves_html() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn compile_then_getmachinecode_roundtrips() {
        let state = Arc::new(AppState::new());
        let app = router(state);

        let body = serde_json::to_vec(&serde_json::json!({
            "code": "{ int a a = 3 print(a) }$",
            "verbose": false,
        }))
        .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/compile")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/getMachineCode/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn out_of_range_program_index_is_404() {
        let app = test_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/getMachineCode/0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
