use ratatui::style::Color;

/// One generative capability exposed by the workflow surface.
///
/// The set is closed: adding a feature means adding a variant here and a row
/// to [`FEATURES`], not new branching scattered through the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Slides,
    Video,
    Roadmap,
    Network,
    Chat,
    Passive,
}

impl FeatureKind {
    /// Kinds that own a request lifecycle (everything except the chat card,
    /// which has its own surface, and passive cards).
    pub fn is_generative(self) -> bool {
        !matches!(self, FeatureKind::Chat | FeatureKind::Passive)
    }

    /// Whether the artifact is a downloadable/viewable file rather than a
    /// reference link. Fixed here, never inferred from a response.
    pub fn is_binary(self) -> bool {
        matches!(self, FeatureKind::Video | FeatureKind::Roadmap)
    }

    /// Fixed filename used when downloading a binary artifact.
    pub fn download_filename(self) -> Option<&'static str> {
        match self {
            FeatureKind::Roadmap => Some("roadmap.pdf"),
            FeatureKind::Video => Some("video_ad.mp4"),
            _ => None,
        }
    }
}

/// Static description of a feature card. Never mutated.
pub struct FeatureDescriptor {
    pub name: &'static str,
    pub icon: &'static str,
    pub endpoint: &'static str,
    pub color: Color,
    pub loading_color: Color,
    pub kind: FeatureKind,
}

/// The feature registry. Order is presentation order on the workflow screen.
pub const FEATURES: &[FeatureDescriptor] = &[
    FeatureDescriptor {
        name: "Slide Deck",
        icon: "📊",
        endpoint: "/create_slides",
        color: Color::Cyan,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Slides,
    },
    FeatureDescriptor {
        name: "Video Ad",
        icon: "🎬",
        endpoint: "/create_video",
        color: Color::Magenta,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Video,
    },
    FeatureDescriptor {
        name: "Roadmap",
        icon: "🗺",
        endpoint: "/create_roadmap",
        color: Color::Green,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Roadmap,
    },
    FeatureDescriptor {
        name: "Investor Network",
        icon: "🤝",
        endpoint: "/find-investors",
        color: Color::Yellow,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Network,
    },
    FeatureDescriptor {
        name: "Chat Assistant",
        icon: "💬",
        endpoint: "/chat",
        color: Color::Blue,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Chat,
    },
    // Announced but not wired to a backend operation yet.
    FeatureDescriptor {
        name: "Email Outreach (soon)",
        icon: "✉",
        endpoint: "",
        color: Color::DarkGray,
        loading_color: Color::DarkGray,
        kind: FeatureKind::Passive,
    },
];

pub fn descriptor(kind: FeatureKind) -> &'static FeatureDescriptor {
    FEATURES
        .iter()
        .find(|d| d.kind == kind)
        .expect("every feature kind has a registry row")
}

/// Request lifecycle phase. There is no persisted error state: failure
/// returns the feature to Idle and the reason is surfaced transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    Ready,
}

/// The generated output of a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// link-kind: a URL to open directly.
    Link(String),
    /// binary-kind: the artifact lives server-side and is re-fetched on each
    /// view/download action. Nothing is cached client-side; the text that
    /// produced it is kept so re-fetches retrieve the same artifact even
    /// after the prompt is edited.
    Document { text: String },
    /// network-kind: a text report rendered inline.
    Report(String),
}

/// Per-feature, per-session state machine. Mutated only by its own handler.
#[derive(Debug)]
pub struct FeatureState {
    pub kind: FeatureKind,
    pub phase: Phase,
    pub result: Option<Artifact>,
    pub last_error: Option<String>,
    seq: u64,
}

impl FeatureState {
    pub fn new(kind: FeatureKind) -> Self {
        Self {
            kind,
            phase: Phase::Idle,
            result: None,
            last_error: None,
            seq: 0,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.kind.is_generative() && self.phase != Phase::Generating
    }

    /// Start a request. Returns the sequence number the eventual resolution
    /// must carry, or None if a request is already outstanding.
    pub fn begin(&mut self) -> Option<u64> {
        if !self.can_generate() {
            return None;
        }
        self.phase = Phase::Generating;
        self.result = None;
        self.last_error = None;
        self.seq += 1;
        Some(self.seq)
    }

    /// Apply a resolution. Stale sequence numbers (a resolution racing a
    /// newer request, or arriving after the state moved on) are dropped.
    /// Returns false when the resolution was ignored.
    pub fn resolve(&mut self, seq: u64, outcome: Result<Artifact, String>) -> bool {
        if seq != self.seq || self.phase != Phase::Generating {
            return false;
        }
        match outcome {
            Ok(artifact) => {
                self.result = Some(artifact);
                self.phase = Phase::Ready;
            }
            Err(reason) => {
                self.last_error = Some(reason);
                self.phase = Phase::Idle;
            }
        }
        true
    }
}

/// How a ready artifact is accessed, fixed per feature kind.
#[derive(Debug, PartialEq, Eq)]
pub enum Access<'a> {
    /// Direct navigation to a link.
    Open(&'a str),
    /// Open the view/download modal. Carries the text that produced the
    /// artifact; modal fetches re-send it, not the current prompt.
    Reveal(&'a str),
    /// Show an inline text report.
    Show(&'a str),
}

/// Exactly one UI affordance for a (descriptor, state) pair.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery<'a> {
    /// A single generate trigger.
    Generate,
    /// Trigger disabled, spinner shown.
    Busy,
    /// A redo trigger plus the kind-specific access action.
    Redo(Access<'a>),
    /// Cards without a request lifecycle (chat entry, passive).
    None,
}

pub fn delivery<'a>(desc: &FeatureDescriptor, state: &'a FeatureState) -> Delivery<'a> {
    if !desc.kind.is_generative() {
        return Delivery::None;
    }
    match state.phase {
        Phase::Idle => Delivery::Generate,
        Phase::Generating => Delivery::Busy,
        Phase::Ready => match state.result {
            Some(Artifact::Link(ref url)) => Delivery::Redo(Access::Open(url)),
            Some(Artifact::Document { ref text }) => Delivery::Redo(Access::Reveal(text)),
            Some(Artifact::Report(ref text)) => Delivery::Redo(Access::Show(text)),
            // Ready without a result cannot be produced by the transitions,
            // but render it as a plain generate rather than panicking.
            None => Delivery::Generate,
        },
    }
}
