/*!
 * Mock font codec for testing.
 *
 * - `MockCodec::working()` - copies the source to the output unchanged
 * - `MockCodec::failing()` - rejects every font
 * - `MockCodec::fail_on(..)` - rejects only the listed file names
 *
 * Subset and convert requests are recorded separately.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use crate::errors::CodecError;
use crate::codec::{ConvertRequest, FontCodec, SubsetRequest};

/// Behavior mode for the mock codec
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds by copying the source font
    Working,
    /// Always fails
    Failing,
    /// Fails for sources whose file name is listed
    FailOn(Vec<String>),
}

/// Mock codec recording every request it receives
#[derive(Debug, Clone)]
pub struct MockCodec {
    behavior: MockBehavior,
    requests: Arc<Mutex<Vec<SubsetRequest>>>,
    conversions: Arc<Mutex<Vec<ConvertRequest>>>,
}

impl MockCodec {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::new(Mutex::new(Vec::new())),
            conversions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn fail_on(file_names: &[&str]) -> Self {
        Self::new(MockBehavior::FailOn(file_names.iter().map(|f| f.to_string()).collect()))
    }

    /// Subset requests received so far, in arrival order
    pub fn requests(&self) -> Vec<SubsetRequest> {
        self.requests.lock().clone()
    }

    /// Convert requests received so far, in arrival order
    pub fn conversions(&self) -> Vec<ConvertRequest> {
        self.conversions.lock().clone()
    }

    fn should_fail(&self, source: &Path) -> bool {
        match &self.behavior {
            MockBehavior::Working => false,
            MockBehavior::Failing => true,
            MockBehavior::FailOn(names) => source
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .is_some_and(|f| names.contains(&f)),
        }
    }
}

#[async_trait]
impl FontCodec for MockCodec {
    async fn subset(&self, request: &SubsetRequest) -> Result<(), CodecError> {
        self.requests.lock().push(request.clone());

        if self.should_fail(&request.source) {
            return Err(CodecError::Failed(format!("mock rejected {:?}", request.source)));
        }

        tokio::fs::copy(&request.source, &request.output).await?;
        Ok(())
    }

    async fn convert(&self, request: &ConvertRequest) -> Result<(), CodecError> {
        self.conversions.lock().push(request.clone());

        if self.should_fail(&request.source) {
            return Err(CodecError::Failed(format!("mock could not convert {:?}", request.source)));
        }

        tokio::fs::copy(&request.source, &request.output).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
