pub mod highlight;
pub mod label;
pub mod normalize;

pub use highlight::{Highlight, push_color, render_attributions};
pub use label::{ClassProbabilities, Label, Prediction, TokenAttribution};
pub use normalize::{clean_optional, clean_text};
