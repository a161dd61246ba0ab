use crate::error::Result;

mod dump_to_file;
mod render_graph;

pub use self::dump_to_file::DumpToFile;
pub use self::render_graph::RenderGraph;

pub trait Transform<T> {
    fn name(&self) -> &'static str;

    /// Concise description of the transformation.
    fn description(&self) -> &'static str;

    /// Applies the transformation to `target`.
    fn transform(&self, target: &mut T) -> Result<()>;
}
