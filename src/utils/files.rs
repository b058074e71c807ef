use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt, Lines},
};

/// Read a file from the given path into a list of strings
pub async fn read_file(path: &str) -> io::Result<Vec<String>> {
    let mut r = file_reader(path).await?;
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

async fn file_reader(path: &str) -> io::Result<Lines<io::BufReader<File>>> {
    let f = File::open(path).await?;

    Ok(io::BufReader::new(f).lines())
}

/// Write one line per entry, creating parent directories as needed
pub fn write_lines<P, I, S>(path: P, lines: I) -> std::io::Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(writer, "{}", line.as_ref())?;
    }

    writer.flush()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn written_lines_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/labels.txt");

        write_lines(&path, ["3", "0", "18"]).unwrap();
        let lines = read_file(path.to_str().unwrap()).await.unwrap();

        assert_eq!(lines, vec!["3", "0", "18"]);
    }
}
