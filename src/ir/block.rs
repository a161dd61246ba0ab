use crate::ir::Container;
use falcon::graph;
use std::fmt;

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Block {
    /// The index of the block.
    index: usize,
    /// The address of the first instruction of this block.
    address: u64,
    /// The statements of this block.
    container: Container,
}

impl Block {
    pub fn new(index: usize, address: u64) -> Self {
        Self {
            index,
            address,
            container: Container::new(),
        }
    }

    /// Returns the index of this `Block`
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the address of this `Block`
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Returns the statement container of this `Block`
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns a mutable reference to the statement container of this `Block`
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// Returns true if this `Block` has no statements
    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }
}

impl graph::Vertex for Block {
    fn index(&self) -> usize {
        self.index
    }

    fn dot_label(&self) -> String {
        format!("{}", self)
    }

    fn dot_fill_color(&self) -> String {
        "#ffddcc".to_string()
    }

    fn dot_font_color(&self) -> String {
        "#000000".to_string()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[ Block: 0x{:X} @ 0x{:X}, {} statements ]",
            self.index,
            self.address,
            self.container.len()
        )
    }
}
