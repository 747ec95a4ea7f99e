mod output;

pub use output::{Output, render_progress_bar};
