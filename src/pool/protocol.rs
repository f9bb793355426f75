//! Framed job protocol between the orchestrator and its workers.
//!
//! Frames are a little-endian `u32` length followed by the payload. A job
//! carries the serialized configuration, the document name, and the raw
//! document bytes; a result carries the outcome flag, the name, the
//! warnings, and the output bytes when processing succeeded. The worker
//! loop is written against plain `Read`/`Write` so it can be driven from
//! in-memory pipes as well as real stdio.

use crate::common::{Diagnostics, Error, ProcessingResult, Result};
use crate::config::{InversionConfig, SerializedConfig};
use crate::pptx::process_document;
use std::io::{self, Read, Write};

/// Upper bound on a single frame; anything larger is a protocol error.
const MAX_FRAME: usize = 1 << 30;

/// Write one length-prefixed frame.
pub fn write_frame(writer: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame. Returns `None` on a clean end of stream; end of stream
/// inside a frame is an error.
pub fn read_frame(reader: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated frame header",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame length out of range",
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Encode a job payload.
pub fn encode_job(config: &InversionConfig, name: &str, doc: &[u8]) -> Vec<u8> {
    let config = config.serialize();
    let mut payload =
        Vec::with_capacity(SerializedConfig::LEN + 4 + name.len() + doc.len());
    payload.extend_from_slice(config.as_bytes());
    payload.extend_from_slice(&(name.len() as u32).to_le_bytes());
    payload.extend_from_slice(name.as_bytes());
    payload.extend_from_slice(doc);
    payload
}

/// Decode a job payload back into its parts.
pub fn decode_job(payload: &[u8]) -> Result<(InversionConfig, String, Vec<u8>)> {
    let mut decoder = Decoder::new(payload);
    let config = SerializedConfig::from_bytes(decoder.take(SerializedConfig::LEN)?)?.decode()?;
    let name_len = decoder.u32()? as usize;
    let name = String::from_utf8(decoder.take(name_len)?.to_vec())
        .map_err(|_| Error::Worker("job name is not UTF-8".into()))?;
    let doc = decoder.rest().to_vec();
    Ok((config, name, doc))
}

/// Encode a processing result.
pub fn encode_result(result: &ProcessingResult) -> Vec<u8> {
    let mut payload = Vec::with_capacity(64 + result.name.len());
    payload.push(u8::from(result.succeeded));
    payload.extend_from_slice(&(result.name.len() as u32).to_le_bytes());
    payload.extend_from_slice(result.name.as_bytes());
    payload.extend_from_slice(&(result.warnings.len() as u32).to_le_bytes());
    for warning in &result.warnings {
        payload.extend_from_slice(&(warning.len() as u32).to_le_bytes());
        payload.extend_from_slice(warning.as_bytes());
    }
    if let Some(output) = &result.output {
        payload.extend_from_slice(output);
    }
    payload
}

/// Decode a processing result.
pub fn decode_result(payload: &[u8]) -> Result<ProcessingResult> {
    let mut decoder = Decoder::new(payload);
    let succeeded = match decoder.u8()? {
        0 => false,
        1 => true,
        other => return Err(Error::Worker(format!("bad result status byte {other}"))),
    };
    let name_len = decoder.u32()? as usize;
    let name = String::from_utf8(decoder.take(name_len)?.to_vec())
        .map_err(|_| Error::Worker("result name is not UTF-8".into()))?;
    let warning_count = decoder.u32()? as usize;
    let mut warnings = Vec::with_capacity(warning_count.min(1024));
    for _ in 0..warning_count {
        let len = decoder.u32()? as usize;
        let warning = String::from_utf8(decoder.take(len)?.to_vec())
            .map_err(|_| Error::Worker("warning is not UTF-8".into()))?;
        warnings.push(warning);
    }
    let output = succeeded.then(|| decoder.rest().to_vec());
    Ok(ProcessingResult {
        name,
        succeeded,
        output,
        warnings,
    })
}

/// Run one document through the whole pipeline.
pub fn process_job(config: &InversionConfig, name: &str, doc: &[u8]) -> ProcessingResult {
    let mut diags = Diagnostics::new();
    match process_document(doc, config, &mut diags) {
        Ok(bytes) => ProcessingResult::success(name, bytes, diags),
        Err(err) => ProcessingResult::failure(name, diags, err.to_string()),
    }
}

/// Worker loop: read jobs until end of stream, answer each with a result
/// frame. Malformed jobs answer with a failed result instead of killing
/// the worker; only transport failures end the loop early.
pub fn worker_main(mut input: impl Read, mut output: impl Write) -> Result<()> {
    while let Some(payload) = read_frame(&mut input)? {
        let result = match decode_job(&payload) {
            Ok((config, name, doc)) => process_job(&config, &name, &doc),
            Err(err) => ProcessingResult::failure(
                "<undecodable job>",
                Diagnostics::new(),
                err.to_string(),
            ),
        };
        write_frame(&mut output, &encode_result(&result))?;
    }
    Ok(())
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::Worker("truncated frame payload".into()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }
}
