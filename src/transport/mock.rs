//! Scripted transport for tests and demos.

use std::collections::VecDeque;

use super::{DeviceFile, Transport, TransportKind, TransportStatus};

type Hook = Box<dyn FnMut(usize) + Send>;

/// A transport replaying scripted chunks or files.
///
/// Stream transports serve `chunks` in order; file-oriented transports serve
/// `files`. An `Err` entry in either list fails the corresponding read.
pub struct MockTransport {
    pub kind: TransportKind,
    pub open_status: TransportStatus,
    pub chunks: VecDeque<Result<Vec<u8>, TransportStatus>>,
    pub files: Vec<(DeviceFile, Result<Vec<u8>, TransportStatus>)>,
    pub file_oriented: bool,
    pub written: Vec<u8>,
    pub open_calls: usize,
    pub close_calls: usize,
    reads: usize,
    hook: Option<Hook>,
}

impl MockTransport {
    pub fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            open_status: TransportStatus::Success,
            chunks: VecDeque::new(),
            files: Vec::new(),
            file_oriented: kind == TransportKind::UsbStorage,
            written: Vec::new(),
            open_calls: 0,
            close_calls: 0,
            reads: 0,
            hook: None,
        }
    }

    /// A stream transport serving `data` in chunks of at most `chunk` bytes.
    pub fn streaming(kind: TransportKind, data: &[u8], chunk: usize) -> Self {
        let mut transport = Self::new(kind);
        transport.file_oriented = false;
        transport.chunks = data.chunks(chunk.max(1)).map(|c| Ok(c.to_vec())).collect();
        transport
    }

    /// A mass-storage transport serving whole files.
    pub fn with_files(files: Vec<(DeviceFile, Vec<u8>)>) -> Self {
        let mut transport = Self::new(TransportKind::UsbStorage);
        transport.files = files.into_iter().map(|(f, d)| (f, Ok(d))).collect();
        transport
    }

    pub fn failing_open(kind: TransportKind, status: TransportStatus) -> Self {
        let mut transport = Self::new(kind);
        transport.open_status = status;
        transport
    }

    /// Run `hook` after every successful read, with the number of reads so far.
    pub fn on_read(mut self, hook: impl FnMut(usize) + Send + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    fn served(&mut self) {
        self.reads += 1;
        if let Some(hook) = &mut self.hook {
            hook(self.reads);
        }
    }
}

impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn open(&mut self) -> TransportStatus {
        self.open_calls += 1;
        self.open_status
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportStatus> {
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let chunk = chunk?;

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(Ok(chunk[n..].to_vec()));
        }

        self.served();
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportStatus> {
        self.written.extend_from_slice(data);
        Ok(data.len())
    }

    fn size_hint(&self) -> Option<u64> {
        if self.file_oriented {
            return None;
        }
        let total = self
            .chunks
            .iter()
            .map(|c| c.as_ref().map_or(0, |c| c.len() as u64))
            .sum();
        Some(total)
    }

    fn is_file_oriented(&self) -> bool {
        self.file_oriented
    }

    fn list_files(&mut self) -> Result<Vec<DeviceFile>, TransportStatus> {
        if !self.file_oriented {
            return Err(TransportStatus::Unsupported);
        }
        Ok(self.files.iter().map(|(f, _)| f.clone()).collect())
    }

    fn read_file(&mut self, file: &DeviceFile) -> Result<Vec<u8>, TransportStatus> {
        let data = self
            .files
            .iter()
            .find(|(f, _)| f == file)
            .map(|(_, d)| d.clone())
            .ok_or(TransportStatus::Io)??;

        self.served();
        Ok(data)
    }
}
