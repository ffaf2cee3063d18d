//! Shared scripted transport for the integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use argus_alpaca::{AlpacaError, HttpClient, HttpResponse};
use async_trait::async_trait;

/// One canned reaction to a matched GET
#[derive(Clone)]
pub enum Step {
    /// 200 with a normal envelope carrying this JSON literal as `Value`
    Value(&'static str),
    /// Connection failure
    Transport,
}

/// Scripted transport: each `(needle, steps)` pair answers GET URLs
/// containing the needle, consuming one step per request and repeating
/// the last step forever. Unmatched URLs get a 404. PUTs always succeed
/// and are recorded.
pub struct ScriptedHttp {
    scripts: Mutex<Vec<(&'static str, VecDeque<Step>)>>,
    gets: Mutex<Vec<String>>,
    puts: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedHttp {
    pub fn new(scripts: Vec<(&'static str, Vec<Step>)>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(needle, steps)| (needle, steps.into_iter().collect()))
                    .collect(),
            ),
            gets: Mutex::new(Vec::new()),
            puts: Mutex::new(Vec::new()),
        }
    }

    /// Replace (or add) the step queue answering `needle`
    pub fn set_steps(&self, needle: &'static str, steps: Vec<Step>) {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(entry) = scripts.iter_mut().find(|(n, _)| *n == needle) {
            entry.1 = steps.into_iter().collect();
        } else {
            scripts.insert(0, (needle, steps.into_iter().collect()));
        }
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    /// Every PUT so far, as `(url, params)`
    pub fn puts(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.puts.lock().unwrap().clone()
    }

    pub fn sent_put(&self, url_needle: &str, key: &str, value: &str) -> bool {
        self.puts.lock().unwrap().iter().any(|(url, params)| {
            url.contains(url_needle) && params.iter().any(|(k, v)| k == key && v == value)
        })
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str) -> argus_alpaca::Result<HttpResponse> {
        self.gets.lock().unwrap().push(url.to_string());
        let mut scripts = self.scripts.lock().unwrap();
        for (needle, steps) in scripts.iter_mut() {
            if url.contains(*needle) {
                let step = if steps.len() > 1 {
                    steps.pop_front().unwrap()
                } else {
                    steps.front().cloned().unwrap()
                };
                return match step {
                    Step::Value(v) => Ok(HttpResponse {
                        status: 200,
                        body: format!(r#"{{"Value": {v}, "ErrorNumber": 0, "ErrorMessage": ""}}"#),
                    }),
                    Step::Transport => Err(AlpacaError::Transport("unreachable".into())),
                };
            }
        }
        Ok(HttpResponse {
            status: 404,
            body: "Not Found".to_string(),
        })
    }

    async fn put_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> argus_alpaca::Result<HttpResponse> {
        self.puts.lock().unwrap().push((
            url.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        Ok(HttpResponse {
            status: 200,
            body: r#"{"ErrorNumber": 0, "ErrorMessage": ""}"#.to_string(),
        })
    }
}
