//! bbox-editor - Interactive bounding-box annotation engine
//!
//! The editor core behind an image-labeling tool: a box store with
//! hit-testing, dual display/pixel coordinate spaces, linear undo/redo, a
//! pointer-gesture state machine and a stepwise review workflow for
//! auto-detected labels. Purely in-memory and event-driven; rendering, file
//! I/O and the widget toolkit live in the host application.

mod config;
mod editor;
mod error;
mod geometry;
mod history;
mod interaction;
mod label;
mod review;
mod store;
mod transform;

pub use config::{CONFIG_VERSION, EditorConfig, LogLevel};
pub use editor::{AnnotationEditor, PixelDetection, PixelLabel};
pub use error::LabelError;
pub use geometry::{Point, Rect};
pub use history::{HistoryEntry, HistoryManager};
pub use interaction::{Gesture, InteractionController, Key, KeyInput};
pub use label::{decode_classes, decode_labels, encode_classes, encode_labels};
pub use review::{Candidate, ReviewSession, ReviewSource};
pub use store::{AnnotationBox, BoxId, BoxIdGen, BoxPatch, BoxStore, HandleKind, Hit};
pub use transform::ViewTransform;
