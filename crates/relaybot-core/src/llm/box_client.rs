//! BoxInferenceClient -- object-safe dynamic dispatch wrapper for InferenceClient.
//!
//! 1. Define an object-safe `InferenceClientDyn` trait with boxed futures
//! 2. Blanket-impl `InferenceClientDyn` for all `T: InferenceClient`
//! 3. `BoxInferenceClient` wraps `Box<dyn InferenceClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use relaybot_types::llm::{InferenceError, Message};

use super::provider::InferenceClient;

/// Object-safe version of [`InferenceClient`] with boxed futures.
pub trait InferenceClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>>;

    fn health_check_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), InferenceError>> + Send + '_>>;
}

impl<T: InferenceClient> InferenceClientDyn for T {
    fn name(&self) -> &str {
        InferenceClient::name(self)
    }

    fn model(&self) -> &str {
        InferenceClient::model(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        messages: &'a [Message],
    ) -> Pin<Box<dyn Future<Output = Result<String, InferenceError>> + Send + 'a>> {
        Box::pin(self.complete(messages))
    }

    fn health_check_boxed(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), InferenceError>> + Send + '_>> {
        Box::pin(self.health_check())
    }
}

/// Type-erased inference client for runtime backend selection.
///
/// Since `InferenceClient` uses RPITIT, it cannot be used as a trait object
/// directly. `BoxInferenceClient` provides the same methods and delegates to
/// the inner `InferenceClientDyn` trait object.
pub struct BoxInferenceClient {
    inner: Box<dyn InferenceClientDyn + Send + Sync>,
}

impl BoxInferenceClient {
    /// Wrap a concrete `InferenceClient` in a type-erased box.
    pub fn new<T: InferenceClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    pub async fn complete(&self, messages: &[Message]) -> Result<String, InferenceError> {
        self.inner.complete_boxed(messages).await
    }

    pub async fn health_check(&self) -> Result<(), InferenceError> {
        self.inner.health_check_boxed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    impl InferenceClient for EchoClient {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, messages: &[Message]) -> Result<String, InferenceError> {
            messages
                .last()
                .map(|m| m.content.clone())
                .ok_or_else(|| InferenceError::MalformedResponse("no messages".to_string()))
        }

        async fn health_check(&self) -> Result<(), InferenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_box_client_delegates() {
        let client = BoxInferenceClient::new(EchoClient);
        assert_eq!(client.name(), "echo");
        assert_eq!(client.model(), "echo-1");

        let reply = client
            .complete(&[Message::system("s"), Message::user("ping")])
            .await
            .unwrap();
        assert_eq!(reply, "ping");
        client.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_box_client_propagates_errors() {
        let client = BoxInferenceClient::new(EchoClient);
        let err = client.complete(&[]).await.unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }
}
