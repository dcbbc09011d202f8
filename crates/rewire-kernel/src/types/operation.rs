//! Operations exposed by request-handling types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request method of a handler operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A handler operation: one request mapping on one method of the type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Method name on the handler type
    pub name: String,
    pub method: RequestMethod,
    pub path: String,
}

impl Operation {
    pub fn new(name: &str, method: RequestMethod, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method,
            path: path.to_string(),
        }
    }

    pub fn get(name: &str, path: &str) -> Self {
        Self::new(name, RequestMethod::Get, path)
    }

    pub fn post(name: &str, path: &str) -> Self {
        Self::new(name, RequestMethod::Post, path)
    }
}
