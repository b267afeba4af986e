use serde::{Deserialize, Serialize};

/// What a client session is showing for the generation flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ViewState {
    #[default]
    Idle,
    Generating,
    Displaying,
    ProxyLoading,
    Displayed,
    GenerationFailed(String),
    ProxyFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "message", rename_all = "snake_case")]
pub enum ViewEvent {
    Submit,
    GenerationSucceeded,
    GenerationFailed(String),
    ProxyRequested,
    ProxyLoaded,
    ProxyFailed(String),
    Retry,
}

impl ViewState {
    /// Whether the view has settled and waits for the next submit. The server
    /// never consults this; it is for clients driving the machine and for tests.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ViewState::Displayed | ViewState::GenerationFailed(_) | ViewState::ProxyFailed(_)
        )
    }
}

/// Applies `event` to `state`. Events that make no sense in `state` leave it as is.
pub fn transition(state: &ViewState, event: ViewEvent) -> ViewState {
    use ViewEvent as E;
    use ViewState as S;

    match (state, event) {
        // A new submit never cancels one already in flight.
        (_, E::Submit) => S::Generating,
        (S::Generating, E::GenerationSucceeded) => S::Displaying,
        (S::Generating, E::GenerationFailed(message)) => S::GenerationFailed(message),
        (S::Displaying, E::ProxyRequested) => S::ProxyLoading,
        (S::ProxyLoading, E::ProxyLoaded) => S::Displayed,
        (S::ProxyLoading, E::ProxyFailed(message)) => S::ProxyFailed(message),
        (S::GenerationFailed(_), E::Retry) => S::Generating,
        (S::ProxyFailed(_), E::Retry) => S::ProxyLoading,
        (current, _) => current.clone(),
    }
}
