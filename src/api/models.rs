use crate::resource::{GroupRef, InstanceRef};

#[derive(Debug, serde::Serialize)]
pub struct PeersResponse {
    pub count: usize,
    pub group: Option<GroupRef>,
    pub members: Vec<InstanceRef>,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
