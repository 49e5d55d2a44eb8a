//! The attribute loader: turns one `-V`-per-`Field` query into a parsed
//! `Attributes` map, off the event loop.

use std::io;
use std::sync::Arc;

use crate::core::{Attributes, Origin};
use crate::tool::BuildTool;

pub fn spawn_load(
    tool: Arc<dyn BuildTool>,
    tree_root: String,
    origin: Origin,
    on_done: impl FnOnce(Origin, io::Result<Attributes>) + Send + 'static,
) {
    std::thread::spawn(move || {
        let result = tool
            .query_attributes(&origin)
            .map(|lines| Attributes::from_lines(&tree_root, &lines));
        on_done(origin, result);
    });
}
