use crate::error::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub trait DumpToFile {
    fn dump_to_file(&self, path: &Path) -> Result<()>;
}

impl<T: fmt::Display> DumpToFile for T {
    fn dump_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write!(writer, "{}", self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_dump_writes_display_output() {
        let path = env::temp_dir().join("decssa_dump_to_file_test.txt");

        "block 0x0".dump_to_file(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "block 0x0");
        fs::remove_file(&path).unwrap();
    }
}
