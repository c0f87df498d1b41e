use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// A call-decorating step. Stages run outer-to-inner in the order they were
/// added to the pipeline; each decides whether and how often to call `next`.
#[async_trait::async_trait]
pub trait CallStage: Send + Sync {
    async fn intercept(&self, request: CallRequest, next: Next<'_>) -> Result<Bytes, CallError>;
}

/// The remainder of the pipeline below the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn CallStage>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub async fn run(self, request: CallRequest) -> Result<Bytes, CallError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    transport: self.transport,
                };
                stage.intercept(request, next).await
            }
            None => self.transport.send(request).await.map_err(CallError::Rpc),
        }
    }
}

pub struct Pipeline {
    stages: Vec<Arc<dyn CallStage>>,
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
}

pub struct PipelineBuilder {
    stages: Vec<Arc<dyn CallStage>>,
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
}

impl PipelineBuilder {
    /// Appends a stage below the ones already added.
    pub fn stage(mut self, stage: Arc<dyn CallStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
            transport: self.transport,
            default_timeout: self.default_timeout,
        }
    }
}

impl Pipeline {
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            transport,
            default_timeout: None,
        }
    }

    pub async fn call(&self, mut request: CallRequest) -> Result<Bytes, CallError> {
        if request.timeout.is_none() {
            request.timeout = self.default_timeout;
        }
        let next = Next {
            stages: &self.stages,
            transport: self.transport.as_ref(),
        };
        next.run(request).await
    }

    /// Typed unary call on behalf of `principal`.
    pub async fn unary<Req, Resp>(
        &self,
        method: &str,
        principal: Option<Principal>,
        message: &Req,
    ) -> Result<Resp, CallError>
    where
        Req: prost::Message,
        Resp: prost::Message + Default,
    {
        let mut request = CallRequest::new(method, Bytes::from(message.encode_to_vec()));
        request.principal = principal;
        let body = self.call(request).await?;
        Ok(Resp::decode(body)?)
    }
}
