//! Prediction pipeline: validation, model session, marshalling and orchestration

mod inference;
mod service;
mod session;
mod tensor;
mod validator;

pub use inference::{compute_checksum, OnnxSession, OnnxSessionLoader, DEFAULT_MODEL_PATH};
pub use service::{PredictionConfig, PredictionService, PredictionStats};
pub use session::{InferenceSession, ModelSessionManager, SessionLoader, SessionStatus};
pub use tensor::{DecodedOutput, ModelInputs, NamedTensor, TensorMarshaller, INPUT_SHAPE};
pub use validator::{validate_field, FieldErrors, RawFields, Validator};
