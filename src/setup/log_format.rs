use std::io;

use slog::{Drain, OwnedKVList, Record, KV};
use slog_term::{Decorator, RecordDecorator, Serializer};

pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f %:z";

/// PkvFormat writes one record per line:
///
/// ```text
/// [2020/05/03 10:13:55.035 +08:00] [INFO] [src/server/server.rs:83] serving, addr: 127.0.0.1:4000, node: 0
/// ```
///
/// Record key-values come first, then those of the logger, such as the `node` every node
/// logger carries.
pub struct PkvFormat<D: Decorator> {
    decorator: D,
}

impl<D: Decorator> PkvFormat<D> {
    pub fn new(decorator: D) -> PkvFormat<D> {
        PkvFormat { decorator }
    }
}

impl<D: Decorator> Drain for PkvFormat<D> {
    type Ok = ();
    type Err = io::Error;

    fn log(&self, record: &Record, values: &OwnedKVList) -> io::Result<()> {
        self.decorator.with_record(record, values, |rd| {
            write_bracketed(rd, Part::Timestamp, record)?;
            write_bracketed(rd, Part::Level, record)?;
            write_bracketed(rd, Part::Location, record)?;

            rd.start_msg()?;
            write!(rd, "{}", record.msg())?;

            // reverse=true buffers every key-value and writes them back to front, so the
            // logger values go in first to come out after the record ones.
            let mut ser = Serializer::new(rd, true, true);
            values.serialize(record, &mut ser)?;
            record.kv().serialize(record, &mut ser)?;
            ser.finish()?;

            rd.start_whitespace()?;
            writeln!(rd)?;
            rd.flush()
        })
    }
}

enum Part {
    Timestamp,
    Level,
    Location,
}

/// write_bracketed writes `[part] ` with the decorator style of that part.
fn write_bracketed(rd: &mut dyn RecordDecorator, part: Part, record: &Record) -> io::Result<()> {
    match part {
        Part::Timestamp => {
            rd.start_timestamp()?;
            write!(rd, "[{}]", chrono::Local::now().format(TIMESTAMP_FORMAT))?;
        }
        Part::Level => {
            rd.start_level()?;
            write!(rd, "[{}]", record.level().as_short_str())?;
        }
        Part::Location => {
            // slog_term has no style for source locations
            rd.start_msg()?;
            write!(rd, "[{}:{}]", record.file(), record.line())?;
        }
    }

    rd.start_whitespace()?;
    write!(rd, " ")
}
