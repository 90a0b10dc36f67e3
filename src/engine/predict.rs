// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Delegates that turn a call contract into a model call.
//!
//! A [`Predict`] formats its inputs into chat messages, sends them to the
//! backend bound to the invocation, and parses the reply as a JSON object
//! holding the contract's output fields. Each step is reported to the
//! invocation's callbacks so it shows up in the trace.

use serde_json::{json, Map, Value};
use std::time::Instant;

use crate::engine::{FieldValue, Inputs, InvocationContext, MediaValue, Prediction};
use crate::errors::UnitError;
use crate::logs::LmCallRecord;
use crate::signature::{CallContract, ContractParseError, FieldSpec, SemanticType};
use crate::trace::TokenUsage;
use crate::traits::{CallKind, ChatMessage, Delegate, ModelRequest};

const ADAPTER: &str = "JSONAdapter";

#[derive(Debug, Clone)]
pub struct Predict {
    name: String,
    contract: CallContract,
}

impl Predict {
    pub fn new(contract: CallContract) -> Self {
        Self {
            name: "Predict".to_string(),
            contract,
        }
    }

    /// Build from the compact `"a, b: int -> c"` form.
    pub fn parse(signature: &str) -> Result<Self, ContractParseError> {
        CallContract::parse(signature).map(Self::new)
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Blocking call for synchronous entry points.
    pub fn call(&self, ctx: &InvocationContext, inputs: &Inputs) -> Result<Prediction, UnitError> {
        match ctx.runtime() {
            Some(handle) => handle.block_on(self.acall(ctx, inputs)),
            None => futures::executor::block_on(self.acall(ctx, inputs)),
        }
    }

    pub async fn acall(
        &self,
        ctx: &InvocationContext,
        inputs: &Inputs,
    ) -> Result<Prediction, UnitError> {
        let module_id = ctx.start_call(CallKind::Module, &self.name, &inputs.to_json());
        let result = self.run(ctx, inputs).await;
        match &result {
            Ok(prediction) => {
                let outputs = Value::Object(prediction.fields().clone());
                ctx.emit_end(&module_id, CallKind::Module, Some(&outputs), None, None);
            }
            Err(e) => {
                let message = e.to_string();
                ctx.emit_end(&module_id, CallKind::Module, None, Some(&message), None);
            }
        }
        result
    }

    async fn run(&self, ctx: &InvocationContext, inputs: &Inputs) -> Result<Prediction, UnitError> {
        let backend = ctx.require_backend()?.clone();

        let format_id = ctx.start_call(CallKind::AdapterFormat, ADAPTER, &inputs.to_json());
        let request = match self.format(inputs) {
            Ok(request) => {
                let outputs = json!({ "messages": request.messages.len() });
                ctx.emit_end(&format_id, CallKind::AdapterFormat, Some(&outputs), None, None);
                request
            }
            Err(e) => {
                let message = e.to_string();
                ctx.emit_end(&format_id, CallKind::AdapterFormat, None, Some(&message), None);
                return Err(e);
            }
        };

        let lm_inputs = json!({ "messages": request.messages });
        let lm_id = ctx.start_call(CallKind::Lm, backend.model_id(), &lm_inputs);
        let started = Instant::now();
        let reply = backend.model().complete(request).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let response = match reply {
            Ok(response) => {
                let usage = TokenUsage::for_model(
                    backend.model_id(),
                    response.input_tokens,
                    response.output_tokens,
                );
                ctx.record_lm_call(LmCallRecord {
                    model: backend.model_id().to_string(),
                    input_tokens: response.input_tokens,
                    output_tokens: response.output_tokens,
                    cost_usd: response.cost_usd,
                    duration_ms,
                    success: true,
                });
                let outputs = Value::String(response.text.clone());
                ctx.emit_end(&lm_id, CallKind::Lm, Some(&outputs), None, Some(&usage));
                response
            }
            Err(e) => {
                ctx.record_lm_call(LmCallRecord {
                    model: backend.model_id().to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                    cost_usd: None,
                    duration_ms,
                    success: false,
                });
                let message = e.to_string();
                ctx.emit_end(&lm_id, CallKind::Lm, None, Some(&message), None);
                return Err(e.into());
            }
        };

        let parse_id = ctx.start_call(
            CallKind::AdapterParse,
            ADAPTER,
            &json!({ "text": response.text }),
        );
        match self.parse_reply(&response.text) {
            Ok(prediction) => {
                let outputs = Value::Object(prediction.fields().clone());
                ctx.emit_end(&parse_id, CallKind::AdapterParse, Some(&outputs), None, None);
                Ok(prediction)
            }
            Err(e) => {
                let message = e.to_string();
                ctx.emit_end(&parse_id, CallKind::AdapterParse, None, Some(&message), None);
                Err(e)
            }
        }
    }

    fn format(&self, inputs: &Inputs) -> Result<ModelRequest, UnitError> {
        let mut system = String::new();
        if !self.contract.instructions.is_empty() {
            system.push_str(&self.contract.instructions);
            system.push_str("\n\n");
        }
        system.push_str("Your input fields are:\n");
        describe_fields(&mut system, &self.contract.inputs);
        system.push_str("Your output fields are:\n");
        describe_fields(&mut system, &self.contract.outputs);
        let keys: Vec<&str> = self.contract.output_names().collect();
        system.push_str(&format!(
            "Respond with a single JSON object with the keys: {}.",
            keys.join(", ")
        ));

        let mut user = String::new();
        let mut attachments: Vec<MediaValue> = Vec::new();
        for (name, spec) in &self.contract.inputs {
            match inputs.get(name) {
                Some(FieldValue::Json(value)) => {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    user.push_str(&format!("{}: {}\n", name, rendered));
                }
                Some(FieldValue::Media(media)) => {
                    user.push_str(&format!(
                        "{}: <{} attachment {}>\n",
                        name,
                        media.kind.as_str(),
                        attachments.len()
                    ));
                    attachments.push(media.clone());
                }
                None if spec.ty.is_optional() => {}
                None => return Err(UnitError::MissingInput(name.clone())),
            }
        }

        Ok(ModelRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user, attachments)],
            output_fields: keys.into_iter().map(str::to_string).collect(),
        })
    }

    fn parse_reply(&self, text: &str) -> Result<Prediction, UnitError> {
        let object = extract_json_object(text)
            .ok_or_else(|| UnitError::Parse("reply does not contain a JSON object".to_string()))?;

        let mut prediction = Prediction::new();
        for (name, spec) in &self.contract.outputs {
            match object.get(name) {
                Some(value) => prediction.insert(name.clone(), value.clone()),
                None if spec.ty.is_optional() => prediction.insert(name.clone(), Value::Null),
                None => {
                    return Err(UnitError::Parse(format!("missing output field '{}'", name)));
                }
            }
        }
        Ok(prediction)
    }
}

impl Delegate for Predict {
    fn contract(&self) -> Option<&CallContract> {
        Some(&self.contract)
    }
}

/// Adds a leading `reasoning` output before the contract's own outputs.
#[derive(Debug, Clone)]
pub struct ChainOfThought {
    predict: Predict,
}

impl ChainOfThought {
    pub fn new(contract: CallContract) -> Self {
        let extended = contract.prepend_output(
            "reasoning",
            FieldSpec::new(SemanticType::Str, "Think step by step in order to produce the outputs."),
        );
        Self {
            predict: Predict::new(extended).named("ChainOfThought"),
        }
    }

    pub fn parse(signature: &str) -> Result<Self, ContractParseError> {
        CallContract::parse(signature).map(Self::new)
    }

    pub fn call(&self, ctx: &InvocationContext, inputs: &Inputs) -> Result<Prediction, UnitError> {
        self.predict.call(ctx, inputs)
    }

    pub async fn acall(
        &self,
        ctx: &InvocationContext,
        inputs: &Inputs,
    ) -> Result<Prediction, UnitError> {
        self.predict.acall(ctx, inputs).await
    }
}

impl Delegate for ChainOfThought {
    fn contract(&self) -> Option<&CallContract> {
        None
    }

    fn inner(&self) -> Option<&dyn Delegate> {
        Some(&self.predict)
    }
}

fn describe_fields(out: &mut String, fields: &crate::signature::FieldMap) {
    for (index, (name, spec)) in fields.iter().enumerate() {
        out.push_str(&format!("{}. `{}` ({})", index + 1, name, spec.ty));
        if !spec.description.is_empty() {
            out.push_str(&format!(": {}", spec.description));
        }
        out.push('\n');
    }
}

/// First `{` to last `}`, parsed as a JSON object.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackendError;
    use crate::traits::{BackendHandle, CallEnd, CallStart, ExecutionCallback, LanguageModel, ModelResponse};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct Scripted {
        reply: Result<String, String>,
        seen: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl LanguageModel for Scripted {
        fn model(&self) -> &str {
            "test/scripted"
        }

        async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(ModelResponse {
                    text: text.clone(),
                    input_tokens: 20,
                    output_tokens: 5,
                    cost_usd: Some(0.001),
                }),
                Err(reason) => Err(BackendError::CallFailed {
                    model: "test/scripted".to_string(),
                    reason: reason.clone(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl ExecutionCallback for Log {
        fn on_start(&self, call: CallStart<'_>) {
            self.0.lock().unwrap().push(format!("start {:?} {}", call.kind, call.name));
        }

        fn on_end(&self, call: CallEnd<'_>) {
            self.0.lock().unwrap().push(format!("end {:?} {}", call.kind, call.error.is_none()));
        }
    }

    fn context(reply: Result<&str, &str>) -> (InvocationContext, Arc<Scripted>, Arc<Log>) {
        let model = Arc::new(Scripted {
            reply: reply.map(str::to_string).map_err(str::to_string),
            seen: Mutex::new(Vec::new()),
        });
        let log = Arc::new(Log::default());
        let ctx = InvocationContext::new("Test")
            .with_backend(BackendHandle::new("default", model.clone()))
            .with_callback(log.clone());
        (ctx, model, log)
    }

    #[tokio::test]
    async fn test_acall_parses_reply_and_records_usage() {
        let (ctx, model, log) = context(Ok("Sure: {\"summary\": \"short\", \"extra\": 1}"));
        let predict = Predict::parse("text -> summary").unwrap();

        let prediction = predict.acall(&ctx, &Inputs::new().with("text", "long text")).await.unwrap();

        assert_eq!(prediction.text("summary"), "short");
        assert!(prediction.get("extra").is_none());
        assert_eq!(ctx.lm_calls().len(), 1);
        assert_eq!(ctx.token_usage().total(), 25);
        assert_eq!(ctx.cost_usd(), Some(0.001));

        let seen = model.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.output_fields, vec!["summary"]);
        assert!(request.messages[1].content.contains("text: long text"));

        let events = log.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start Module Predict",
                "start AdapterFormat JSONAdapter",
                "end AdapterFormat true",
                "start Lm test/scripted",
                "end Lm true",
                "start AdapterParse JSONAdapter",
                "end AdapterParse true",
                "end Module true",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_output_field_is_parse_error() {
        let (ctx, _, log) = context(Ok("{\"other\": 1}"));
        let predict = Predict::parse("text -> summary").unwrap();

        let err = predict.acall(&ctx, &Inputs::new().with("text", "x")).await.unwrap_err();
        assert!(matches!(err, UnitError::Parse(_)));
        assert_eq!(log.0.lock().unwrap().last().unwrap(), "end Module false");
    }

    #[tokio::test]
    async fn test_backend_failure_is_recorded() {
        let (ctx, _, _) = context(Err("rate limited"));
        let predict = Predict::parse("text -> summary").unwrap();

        let err = predict.acall(&ctx, &Inputs::new().with("text", "x")).await.unwrap_err();
        assert!(matches!(err, UnitError::Backend(BackendError::CallFailed { .. })));
        assert!(!ctx.lm_calls()[0].success);
    }

    #[tokio::test]
    async fn test_missing_input_and_no_backend() {
        let (ctx, _, _) = context(Ok("{}"));
        let predict = Predict::parse("text -> summary").unwrap();
        let err = predict.acall(&ctx, &Inputs::new()).await.unwrap_err();
        assert!(matches!(err, UnitError::MissingInput(name) if name == "text"));

        let bare = InvocationContext::new("Bare");
        let err = predict.acall(&bare, &Inputs::new().with("text", "x")).await.unwrap_err();
        assert!(matches!(err, UnitError::Backend(BackendError::NoBackend)));
    }

    #[test]
    fn test_blocking_call_without_runtime() {
        let (ctx, _, _) = context(Ok("{\"summary\": \"ok\"}"));
        let predict = Predict::parse("text -> summary").unwrap();
        let prediction = predict.call(&ctx, &Inputs::new().with("text", "x")).unwrap();
        assert_eq!(prediction.text("summary"), "ok");
    }

    #[test]
    fn test_chain_of_thought_wraps_predict() {
        let cot = ChainOfThought::parse("topic -> headline").unwrap();
        assert!(cot.contract().is_none());
        let resolved = cot.resolved_contract().unwrap();
        assert_eq!(resolved.output_names().collect::<Vec<_>>(), vec!["reasoning", "headline"]);
    }
}
