//! Write command implementation.

use super::{CommandError, CommandResult, Format};
use diskbuf_core::{handoff, Buffer, Config, Flush, FlushReceiver, ProcessContext};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

/// What a write run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Input lines buffered.
    pub lines: u64,
    /// Descriptors printed.
    pub segments: u64,
}

/// Runs the write command over stdin and stdout.
pub fn run(path: &Path, config: Config, format: Format) -> CommandResult<Summary> {
    let (summary, _) = pipe(path, config, format, io::stdin().lock(), io::stdout())?;
    Ok(summary)
}

/// Buffers each line of `input` as one write and prints a descriptor to
/// `output` for every segment the buffer closes.
///
/// Lines keep their terminator. The buffer is closed when `input` ends,
/// so the last partial segment is published too.
pub fn pipe<R, W>(
    path: &Path,
    config: Config,
    format: Format,
    mut input: R,
    output: W,
) -> CommandResult<(Summary, W)>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let ctx = Arc::new(ProcessContext::new());
    let (tx, rx) = handoff::rendezvous();
    let buffer = Buffer::builder(&ctx, path).config(config).queue(tx).open()?;
    let printer = thread::Builder::new()
        .name("diskbuf-printer".into())
        .spawn(move || print_all(rx, format, output))?;

    let fed = feed(&buffer, &mut input).and_then(|lines| {
        buffer.close()?;
        Ok(lines)
    });
    drop(buffer);

    // The printer ends once the buffer's sender is gone. Its failure is
    // the root cause of any handoff error seen while feeding.
    let printed = printer.join().map_err(|_| CommandError::Printer)?;
    match (fed, printed) {
        (Ok(lines), Ok((segments, output))) => Ok((Summary { lines, segments }, output)),
        (_, Err(err)) | (Err(err), Ok(_)) => Err(err),
    }
}

fn feed<R: BufRead>(buffer: &Buffer, input: &mut R) -> CommandResult<u64> {
    let mut lines = 0;
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(lines);
        }
        buffer.write(&line)?;
        lines += 1;
    }
}

fn print_all<W: Write>(rx: FlushReceiver, format: Format, mut output: W) -> CommandResult<(u64, W)> {
    let mut count = 0;
    for flush in rx {
        print_flush(&mut output, &flush, format)?;
        output.flush()?;
        count += 1;
    }
    Ok((count, output))
}

fn print_flush<W: Write>(output: &mut W, flush: &Flush, format: Format) -> CommandResult<()> {
    match format {
        Format::Json => {
            serde_json::to_writer(&mut *output, flush)?;
            writeln!(output)?;
        }
        Format::Text => writeln!(output, "{flush}")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskbuf_core::Reason;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn quiet() -> Config {
        Config::new().verbosity(0)
    }

    #[test]
    fn lines_rotate_by_count() {
        let dir = tempdir().unwrap();
        let input = Cursor::new("a\nb\nc\nd\ne\n");

        let (summary, output) = pipe(
            &dir.path().join("spool"),
            quiet().flush_writes(2),
            Format::Json,
            input,
            Vec::new(),
        )
        .unwrap();

        assert_eq!(summary, Summary { lines: 5, segments: 3 });
        let flushes: Vec<Flush> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(flushes[0].reason, Reason::Writes);
        assert_eq!(flushes[2].reason, Reason::Forced);
        assert_eq!(fs::read(&flushes[0].path).unwrap(), b"a\nb\n");
        assert_eq!(fs::read(&flushes[2].path).unwrap(), b"e\n");
    }

    #[test]
    fn unterminated_last_line_is_kept() {
        let dir = tempdir().unwrap();

        let (summary, output) = pipe(
            &dir.path().join("spool"),
            quiet().flush_bytes(1024),
            Format::Text,
            Cursor::new("one\ntwo"),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(summary, Summary { lines: 2, segments: 1 });
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("(forced): 2 writes, 7 bytes"));
    }

    #[test]
    fn empty_input_publishes_nothing() {
        let dir = tempdir().unwrap();

        let (summary, output) = pipe(
            &dir.path().join("spool"),
            quiet().flush_writes(1),
            Format::Text,
            Cursor::new(""),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(summary, Summary { lines: 0, segments: 0 });
        assert!(output.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[derive(Debug)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn printer_failure_is_reported_over_handoff_error() {
        let dir = tempdir().unwrap();

        let err = pipe(
            &dir.path().join("spool"),
            quiet().flush_writes(1),
            Format::Text,
            Cursor::new("a\nb\nc\n"),
            BrokenPipe,
        )
        .unwrap_err();

        assert!(
            matches!(&err, CommandError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe),
            "unexpected error: {err}"
        );
    }

    struct FailingInput;

    impl io::Read for FailingInput {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("input gone"))
        }
    }

    #[test]
    fn input_failure_still_joins_printer() {
        let dir = tempdir().unwrap();

        let err = pipe(
            &dir.path().join("spool"),
            quiet().flush_writes(1),
            Format::Text,
            io::BufReader::new(FailingInput),
            Vec::new(),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "I/O error: input gone");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempdir().unwrap();
        let err = pipe(
            &dir.path().join("spool"),
            quiet(),
            Format::Text,
            Cursor::new("x\n"),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Buffer(_)));
    }
}
