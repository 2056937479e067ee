//! The stream registry (spec.md §3/§6): a genuine collaborator with real
//! file-backed I/O, not a stub -- built-ins like `read_term/3`,
//! `write_term/3`, `get_char/2`, `put_char/2` need it to be exercised by
//! tests. No teacher counterpart for the registry shape itself; the
//! `std::io::{Read, Write}` usage follows the teacher's own
//! `builtin_write`/`builtin_nl` (`machine/core.rs`), which already reaches
//! for `std::io` directly rather than a higher-level I/O crate.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::PrologError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Text,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofAction {
    Error,
    EofCode,
    Reset,
}

enum Io {
    Read(Box<dyn Read>),
    Write(Box<dyn Write>),
}

pub struct StreamHandle {
    pub mode: Mode,
    pub kind: StreamType,
    pub reposition: bool,
    pub eof_action: EofAction,
    io: Io,
    hit_eof: bool,
}

impl StreamHandle {
    /// Reads one character (text streams only). `None` signals end of
    /// stream, honoring `eof_action` (spec.md §5 resource scoping / §6).
    pub fn get_char(&mut self) -> Result<Option<char>, PrologError> {
        let Io::Read(r) = &mut self.io else {
            return Err(PrologError::permission_error(
                "input",
                "stream",
                crate::term::Term::atom("write_only"),
            ));
        };
        if self.hit_eof {
            return self.eof_response();
        }
        let mut buf = [0u8; 1];
        match r.read(&mut buf) {
            Ok(0) => {
                self.hit_eof = true;
                self.eof_response()
            }
            Ok(_) => Ok(Some(buf[0] as char)),
            Err(e) => Err(PrologError::SystemError {
                detail: e.to_string(),
            }),
        }
    }

    fn eof_response(&self) -> Result<Option<char>, PrologError> {
        match self.eof_action {
            EofAction::EofCode => Ok(None),
            EofAction::Reset => Ok(None),
            EofAction::Error => Err(PrologError::permission_error(
                "input",
                "past_end_of_stream",
                crate::term::Term::atom("end_of_stream"),
            )),
        }
    }

    pub fn put_char(&mut self, c: char) -> Result<(), PrologError> {
        let Io::Write(w) = &mut self.io else {
            return Err(PrologError::permission_error(
                "output",
                "stream",
                crate::term::Term::atom("read_only"),
            ));
        };
        let mut buf = [0u8; 4];
        w.write_all(c.encode_utf8(&mut buf).as_bytes())
            .map_err(|e| PrologError::SystemError {
                detail: e.to_string(),
            })
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), PrologError> {
        let Io::Write(w) = &mut self.io else {
            return Err(PrologError::permission_error(
                "output",
                "stream",
                crate::term::Term::atom("read_only"),
            ));
        };
        w.write_all(s.as_bytes()).map_err(|e| PrologError::SystemError {
            detail: e.to_string(),
        })
    }

    pub fn flush(&mut self) -> Result<(), PrologError> {
        if let Io::Write(w) = &mut self.io {
            w.flush().map_err(|e| PrologError::SystemError {
                detail: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Open options as decoded from `open/4`'s options list (spec.md §6).
pub struct OpenOptionsSpec {
    pub alias: Option<Rc<str>>,
    pub kind: StreamType,
    pub reposition: bool,
    pub eof_action: EofAction,
}

impl Default for OpenOptionsSpec {
    fn default() -> Self {
        OpenOptionsSpec {
            alias: None,
            kind: StreamType::Text,
            reposition: false,
            eof_action: EofAction::Error,
        }
    }
}

pub struct Streams {
    handles: HashMap<Rc<str>, StreamHandle>,
    current_input: Rc<str>,
    current_output: Rc<str>,
    next_id: u64,
}

impl Streams {
    pub fn new() -> Self {
        let mut handles = HashMap::new();
        handles.insert(
            Rc::from("user_input"),
            StreamHandle {
                mode: Mode::Read,
                kind: StreamType::Text,
                reposition: false,
                eof_action: EofAction::EofCode,
                io: Io::Read(Box::new(io::stdin())),
                hit_eof: false,
            },
        );
        handles.insert(
            Rc::from("user_output"),
            StreamHandle {
                mode: Mode::Write,
                kind: StreamType::Text,
                reposition: false,
                eof_action: EofAction::Error,
                io: Io::Write(Box::new(io::stdout())),
                hit_eof: false,
            },
        );
        handles.insert(
            Rc::from("user_error"),
            StreamHandle {
                mode: Mode::Write,
                kind: StreamType::Text,
                reposition: false,
                eof_action: EofAction::Error,
                io: Io::Write(Box::new(io::stderr())),
                hit_eof: false,
            },
        );
        Streams {
            handles,
            current_input: Rc::from("user_input"),
            current_output: Rc::from("user_output"),
            next_id: 0,
        }
    }

    pub fn open(
        &mut self,
        path: &str,
        mode: Mode,
        opts: OpenOptionsSpec,
    ) -> Result<Rc<str>, PrologError> {
        let mut oo = OpenOptions::new();
        match mode {
            Mode::Read => {
                oo.read(true);
            }
            Mode::Write => {
                oo.write(true).create(true).truncate(true);
            }
            Mode::Append => {
                oo.write(true).create(true).append(true);
            }
        }
        let file = oo.open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PrologError::existence_error("source_sink", crate::term::Term::atom(path))
            } else {
                PrologError::permission_error(
                    "open",
                    "source_sink",
                    crate::term::Term::atom(path),
                )
            }
        })?;
        let io_dir = match mode {
            Mode::Read => Io::Read(Box::new(file)),
            Mode::Write | Mode::Append => Io::Write(Box::new(file)),
        };
        let id: Rc<str> = match &opts.alias {
            Some(a) => a.clone(),
            None => {
                let id = format!("$stream_{}", self.next_id);
                self.next_id += 1;
                Rc::from(id)
            }
        };
        self.handles.insert(
            id.clone(),
            StreamHandle {
                mode,
                kind: opts.kind,
                reposition: opts.reposition,
                eof_action: opts.eof_action,
                io: io_dir,
                hit_eof: false,
            },
        );
        Ok(id)
    }

    pub fn close(&mut self, id: &str, force: bool) -> Result<(), PrologError> {
        match self.handles.get_mut(id) {
            Some(h) => {
                let r = h.flush();
                self.handles.remove(id);
                if force {
                    Ok(())
                } else {
                    r
                }
            }
            None => Err(PrologError::existence_error(
                "stream",
                crate::term::Term::atom(id),
            )),
        }
    }

    pub fn get(&self, id: &str) -> Option<&StreamHandle> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut StreamHandle, PrologError> {
        self.handles
            .get_mut(id)
            .ok_or_else(|| PrologError::existence_error("stream", crate::term::Term::atom(id)))
    }

    pub fn current_input(&self) -> Rc<str> {
        self.current_input.clone()
    }

    pub fn current_output(&self) -> Rc<str> {
        self.current_output.clone()
    }

    pub fn set_input(&mut self, id: Rc<str>) -> Result<(), PrologError> {
        if !self.handles.contains_key(&*id) {
            return Err(PrologError::existence_error(
                "stream",
                crate::term::Term::atom(id),
            ));
        }
        self.current_input = id;
        Ok(())
    }

    pub fn set_output(&mut self, id: Rc<str>) -> Result<(), PrologError> {
        if !self.handles.contains_key(&*id) {
            return Err(PrologError::existence_error(
                "stream",
                crate::term::Term::atom(id),
            ));
        }
        self.current_output = id;
        Ok(())
    }
}

impl Default for Streams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_streams_are_preinstalled() {
        let s = Streams::new();
        assert!(s.get("user_input").is_some());
        assert!(s.get("user_output").is_some());
        assert_eq!(&*s.current_input(), "user_input");
    }

    #[test]
    fn open_write_then_read_round_trips() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("prolog_core_test_{}.txt", std::process::id()));
        let path_str = path.to_str().unwrap();
        let mut streams = Streams::new();
        let id = streams
            .open(path_str, Mode::Write, OpenOptionsSpec::default())
            .unwrap();
        streams.get_mut(&id).unwrap().write_str("hi").unwrap();
        streams.close(&id, false).unwrap();

        let id = streams
            .open(path_str, Mode::Read, OpenOptionsSpec::default())
            .unwrap();
        let mut out = String::new();
        loop {
            match streams.get_mut(&id).unwrap().get_char().unwrap() {
                Some(c) => out.push(c),
                None => break,
            }
        }
        assert_eq!(out, "hi");
        streams.close(&id, false).unwrap();
        let _ = std::fs::remove_file(path_str);
    }

    #[test]
    fn closing_unknown_stream_is_existence_error() {
        let mut s = Streams::new();
        assert!(matches!(
            s.close("nope", false),
            Err(PrologError::ExistenceError { .. })
        ));
    }
}
