use std::fmt;

/// Errors raised while turning a flat parameter mapping into a reform.
#[derive(Debug, Clone, PartialEq)]
pub enum ReformError {
    /// The override names a path absent from the engine's parameter tree.
    UnresolvableParameter(String),
    /// The override value cannot be interpreted as a parameter value.
    InvalidValue { path: String, value: String },
    /// The effective-date range is inverted (end before start).
    InvertedDateRange { path: String },
}

impl fmt::Display for ReformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReformError::UnresolvableParameter(path) => {
                write!(f, "unknown parameter path {path:?}")
            }
            ReformError::InvalidValue { path, value } => {
                write!(f, "invalid value {value:?} for parameter {path:?}")
            }
            ReformError::InvertedDateRange { path } => {
                write!(f, "effective-date range for {path:?} ends before it starts")
            }
        }
    }
}

impl std::error::Error for ReformError {}

/// Errors raised while mapping a household situation to engine input.
#[derive(Debug, Clone)]
pub enum SituationError {
    /// No `household` key in the request, or it is not an object.
    MissingHousehold,
    /// The situation describes no people.
    EmptyHousehold,
    /// A person sets a variable the engine does not know.
    UnknownVariable { person: String, variable: String },
    /// The situation JSON does not match the expected shape.
    Malformed(String),
}

impl fmt::Display for SituationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SituationError::MissingHousehold => {
                write!(f, "request has no household description")
            }
            SituationError::EmptyHousehold => write!(f, "household describes no people"),
            SituationError::UnknownVariable { person, variable } => {
                write!(f, "person {person:?} sets unknown variable {variable:?}")
            }
            SituationError::Malformed(msg) => write!(f, "malformed household: {msg}"),
        }
    }
}

impl std::error::Error for SituationError {}

/// Failures surfaced by the simulation engine, preserved verbatim.
#[derive(Debug, Clone)]
pub enum EngineError {
    UnknownVariable(String),
    /// `map_to` asked for an entity the variable cannot be mapped to.
    BadEntityMapping { variable: String, entity: &'static str },
    /// Anything else the engine reports; the message is kept as-is.
    Computation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownVariable(name) => write!(f, "unknown variable {name:?}"),
            EngineError::BadEntityMapping { variable, entity } => {
                write!(f, "variable {variable:?} cannot be mapped to entity {entity}")
            }
            EngineError::Computation(msg) => write!(f, "engine computation failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Cache store I/O failure. Always treated as a soft failure by callers:
/// a failing read is a miss, a failing write is skipped.
#[derive(Debug)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache store unavailable: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Anything that can go wrong while dispatching one endpoint request.
#[derive(Debug)]
pub enum DispatchError {
    UnknownCountry(String),
    UnknownEndpoint { country: String, endpoint: String },
    Reform(ReformError),
    Situation(SituationError),
    Engine(EngineError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownCountry(name) => write!(f, "unknown country {name:?}"),
            DispatchError::UnknownEndpoint { country, endpoint } => {
                write!(f, "country {country:?} has no endpoint {endpoint:?}")
            }
            DispatchError::Reform(e) => write!(f, "{e}"),
            DispatchError::Situation(e) => write!(f, "{e}"),
            DispatchError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Reform(e) => Some(e),
            DispatchError::Situation(e) => Some(e),
            DispatchError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReformError> for DispatchError {
    fn from(err: ReformError) -> Self {
        DispatchError::Reform(err)
    }
}

impl From<SituationError> for DispatchError {
    fn from(err: SituationError) -> Self {
        DispatchError::Situation(err)
    }
}

impl From<EngineError> for DispatchError {
    fn from(err: EngineError) -> Self {
        DispatchError::Engine(err)
    }
}
