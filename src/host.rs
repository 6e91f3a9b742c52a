//! Host wiring: reads filter requests as JSON lines and answers each one
//! with the filtered page info.

use crate::applicability::ApplicabilityResolver;
use crate::config::Config;
use crate::filter::{FilterOutcome, filter_page_info_json};
use crate::protocol::{ErrorResponse, FilterRequest, FilterResponse};
use crate::repository::{ContentRepository, RepositoryResolver};
use crate::request_id::RequestId;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Current repository snapshot. Reloads swap the whole snapshot, so a
/// request keeps the resolver it started with.
pub type SharedResolver = Arc<RwLock<Arc<RepositoryResolver>>>;

pub fn load_resolver(config: &Config) -> anyhow::Result<RepositoryResolver> {
    let repository = ContentRepository::from_config(config)?;
    Ok(RepositoryResolver::new(Arc::new(repository)))
}

pub async fn reload(shared: &SharedResolver, config_path: &str) -> anyhow::Result<usize> {
    let config = Config::from_file(config_path)?;
    let resolver = load_resolver(&config)?;
    let nodes = resolver.repository().node_count();
    *shared.write().await = Arc::new(resolver);
    Ok(nodes)
}

pub fn handle_line<R>(line: &str, resolver: &R) -> String
where
    R: ApplicabilityResolver + ?Sized,
{
    let request: FilterRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Invalid filter request: {}", e);
            return encode(&ErrorResponse::new(None, "invalid_request", e.to_string()));
        }
    };

    let request_id = RequestId::from_request(request.request_id.as_deref());
    let span = request_id.span(&request.path);
    let _enter = span.enter();

    match filter_page_info_json(request.page_info, &request.path, resolver) {
        Ok((page_info, outcome)) => {
            let warning = match outcome {
                FilterOutcome::Filtered(stats) => {
                    debug!("Kept {} workflow models, dropped {}", stats.kept, stats.dropped);
                    None
                }
                FilterOutcome::MissingWorkflows => Some("missing_workflows".to_string()),
            };
            encode(&FilterResponse {
                request_id: request_id.0,
                page_info,
                warning,
            })
        }
        Err(e) => {
            warn!("Failed to filter page info: {}", e);
            encode(&ErrorResponse::new(Some(request_id.0), "structural_error", e.to_string()))
        }
    }
}

fn encode<T: Serialize>(message: &T) -> String {
    serde_json::to_string(message).unwrap_or_else(|e| {
        warn!("Failed to encode response: {}", e);
        r#"{"error":{"message":"failed to encode response","type":"internal_error"}}"#.to_string()
    })
}

/// Answers requests until the reader is exhausted.
pub async fn run<I, O>(input: I, mut output: O, resolver: SharedResolver) -> anyhow::Result<usize>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let current = resolver.read().await.clone();
        let response = handle_line(&line, current.as_ref());
        output.write_all(response.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        handled += 1;
    }
    info!("Input closed after {} requests", handled);
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::io::Write;

    const REPOSITORY: &str = r#"
nodes:
  - path: /etc/workflow/models/m1/jcr:content
    properties:
      appliesTo: ["/content/dam/.*"]
  - path: /etc/workflow/models/m1/jcr:content/model
  - path: /etc/workflow/models/m2/jcr:content
    properties:
      appliesTo: ["/content/site/.*"]
  - path: /etc/workflow/models/m2/jcr:content/model
"#;

    fn shared(yaml: &str) -> SharedResolver {
        let config = Config::from_yaml(yaml).unwrap();
        Arc::new(RwLock::new(Arc::new(load_resolver(&config).unwrap())))
    }

    fn dam_request(id: Option<&str>) -> String {
        json!({
            "requestId": id,
            "path": "/content/dam/assets/img.png",
            "pageInfo": {
                "workflows": {
                    "dam": {
                        "models": [
                            {"wid": "/etc/workflow/models/m1/jcr:content/model"},
                            {"wid": "/etc/workflow/models/m2/jcr:content/model"}
                        ]
                    }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_handle_line_filters_page_info() {
        let resolver = load_resolver(&Config::from_yaml(REPOSITORY).unwrap()).unwrap();

        let response: Value = serde_json::from_str(&handle_line(&dam_request(Some("req-7")), &resolver)).unwrap();

        assert_eq!(
            response,
            json!({
                "requestId": "req-7",
                "pageInfo": {
                    "workflows": {
                        "dam": {"models": [{"wid": "/etc/workflow/models/m1/jcr:content/model"}]}
                    }
                }
            })
        );
    }

    #[test]
    fn test_handle_line_flags_missing_workflows() {
        let resolver = load_resolver(&Config::default()).unwrap();
        let line = json!({"requestId": "r", "path": "/content/site", "pageInfo": {"status": 1}}).to_string();

        let response: Value = serde_json::from_str(&handle_line(&line, &resolver)).unwrap();

        assert_eq!(response["pageInfo"], json!({"status": 1}));
        assert_eq!(response["warning"], json!("missing_workflows"));
    }

    #[test]
    fn test_handle_line_reports_errors() {
        let resolver = load_resolver(&Config::default()).unwrap();

        let response: Value = serde_json::from_str(&handle_line("not json", &resolver)).unwrap();
        assert_eq!(response["error"]["type"], json!("invalid_request"));
        assert!(response.get("requestId").is_none());

        let line = json!({"requestId": "r", "path": "/content", "pageInfo": {"workflows": []}}).to_string();
        let response: Value = serde_json::from_str(&handle_line(&line, &resolver)).unwrap();
        assert_eq!(response["requestId"], json!("r"));
        assert_eq!(response["error"]["type"], json!("structural_error"));
    }

    #[test]
    fn test_handle_line_drops_only_models_with_broken_patterns() {
        let yaml = r#"
nodes:
  - path: /etc/workflow/models/m1/jcr:content
    properties:
      appliesTo: ["/content/dam)|(/x"]
  - path: /etc/workflow/models/m1/jcr:content/model
  - path: /etc/workflow/models/m2/jcr:content
    properties:
      appliesTo: ["/content/(unclosed"]
  - path: /etc/workflow/models/m2/jcr:content/model
  - path: /etc/workflow/models/m3/jcr:content
    properties:
      appliesTo: ["/content/dam/.*"]
  - path: /etc/workflow/models/m3/jcr:content/model
"#;
        let resolver = load_resolver(&Config::from_yaml(yaml).unwrap()).unwrap();
        let line = json!({
            "requestId": "bad-patterns",
            "path": "/content/dam/assets/img.png",
            "pageInfo": {
                "workflows": {
                    "dam": {
                        "models": [
                            {"wid": "/etc/workflow/models/m1/jcr:content/model"},
                            {"wid": "/etc/workflow/models/m2/jcr:content/model"},
                            {"wid": "/etc/workflow/models/m3/jcr:content/model"}
                        ]
                    }
                }
            }
        })
        .to_string();

        let response: Value = serde_json::from_str(&handle_line(&line, &resolver)).unwrap();

        assert!(response.get("error").is_none(), "{response}");
        assert_eq!(
            response["pageInfo"]["workflows"]["dam"]["models"],
            json!([{"wid": "/etc/workflow/models/m3/jcr:content/model"}])
        );
    }

    #[tokio::test]
    async fn test_run_answers_each_line() {
        let input = format!("{}\n\n{}\n", dam_request(Some("a")), dam_request(None));
        let mut output = Vec::new();

        let handled = run(input.as_bytes(), &mut output, shared(REPOSITORY)).await.unwrap();

        assert_eq!(handled, 2);
        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["requestId"], json!("a"));
        assert!(lines[1]["requestId"].as_str().is_some_and(|id| !id.is_empty()));
        for line in &lines {
            assert_eq!(line["pageInfo"]["workflows"]["dam"]["models"].as_array().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_reload_swaps_repository() {
        let shared = shared(REPOSITORY);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"nodes:\n  - path: /etc/workflow/models/m2/jcr:content/model\n").unwrap();

        let nodes = reload(&shared, file.path().to_str().unwrap()).await.unwrap();

        assert_eq!(nodes, 1);
        let current = shared.read().await.clone();
        assert!(current.lookup("/etc/workflow/models/m1/jcr:content/model").is_none());
        assert!(current.lookup("/etc/workflow/models/m2/jcr:content/model").unwrap().is_universal());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let shared = shared(REPOSITORY);

        assert!(reload(&shared, "/nonexistent/repository.yaml").await.is_err());

        assert_eq!(shared.read().await.repository().node_count(), 4);
    }
}
