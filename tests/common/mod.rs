#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use football_etl::backoff::{ApiRequest, HttpGet, HttpResponse, Sleeper};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn ok(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        retry_after: None,
        body: body.to_string(),
    }
}

pub fn status(code: u16, retry_after: Option<&str>, body: &str) -> HttpResponse {
    HttpResponse {
        status: code,
        retry_after: retry_after.map(|s| s.to_string()),
        body: body.to_string(),
    }
}

/// Serves canned responses in order and records every request it saw.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: RefCell<VecDeque<HttpResponse>>,
    pub seen: RefCell<Vec<ApiRequest>>,
}

impl ScriptedHttp {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl HttpGet for ScriptedHttp {
    fn fetch(&self, req: &ApiRequest) -> Result<HttpResponse> {
        self.seen.borrow_mut().push(req.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left for {}", req.url))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}
