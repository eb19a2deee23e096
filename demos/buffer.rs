//! Buffer bytes written from Rust and read back as a C string.
//!
//! Run with: cargo run --example buffer

use std::ffi::CStr;

use handle_shim::Buffer;

fn main() -> handle_shim::Result<()> {
    handle_shim::init()?;

    let mut buf = Buffer::new(1024)?;
    buf.as_mut_slice()[..6].copy_from_slice(b"hello\0");

    let s = CStr::from_bytes_until_nul(buf.as_slice())
        .map_err(|e| handle_shim::Error::InvalidArgument(e.to_string()))?;
    println!("{}", s.to_string_lossy());
    println!("buffer {:?} holds {} bytes", buf.id(), buf.len());

    // Buffer is closed on drop; shutdown only succeeds after that.
    drop(buf);
    handle_shim::shutdown()?;
    Ok(())
}
