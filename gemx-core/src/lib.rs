pub mod clock;
pub mod error;
pub mod fingerprint;
pub mod host;
pub mod loader;
pub mod locate;
pub mod model;
pub mod normalize;
pub mod render;
pub mod service;
pub mod title;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GemxError, Result, ViewError};
pub use fingerprint::{Accumulator, dedupe, fingerprint};
pub use host::{ChatUrl, ExportSettings, export_filename, write_export};
pub use loader::{Loader, LoaderConfig, LoaderState, TerminalReason, Traversal};
pub use model::{Direction, Export, Message, MessageRole, RoleCounts};
pub use render::render_document;
pub use service::{export_to_raw_json, extract};
pub use title::derive_title;
pub use view::{ChatView, ReplayView, ScrollMetrics, ScrollRegion, ScrollTarget, StaticView};
