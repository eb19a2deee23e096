//! Person through the C ABI and through the safe wrapper.
//!
//! Run with: cargo run --example person

use std::ffi::CStr;
use std::os::raw::c_char;

use handle_shim::ffi;
use handle_shim::Person;

fn main() -> handle_shim::Result<()> {
    handle_shim::init()?;

    println!("API Version: {}", handle_shim::api_version());

    println!("\n--- Fast path ---");
    unsafe {
        let p = ffi::hs_person_new(c"gopher".as_ptr(), 10);
        if !p.is_valid() {
            return Err(handle_shim::Error::AllocationFailed("person".to_string()));
        }

        let mut buf = [0 as c_char; 64];
        let name = ffi::hs_person_get_name(p, buf.as_mut_ptr(), buf.len() as i32);
        let age = ffi::hs_person_get_age(p);
        println!("{}, {} years old.", CStr::from_ptr(name).to_string_lossy(), age);

        // A short buffer truncates instead of overflowing.
        let mut short = [0 as c_char; 4];
        let name = ffi::hs_person_get_name(p, short.as_mut_ptr(), short.len() as i32);
        println!("truncated: {:?}", CStr::from_ptr(name).to_string_lossy());

        ffi::hs_person_delete(p);
    }

    println!("\n--- Checked path ---");
    let mut p = Person::new("gopher", 10)?;
    println!("{}, {} years old.", p.name()?, p.age()?);

    p.set("ferris", 8)?;
    println!("{}, {} years old.", p.name()?, p.age()?);

    let id = p.id();
    p.close()?;
    let code = unsafe { ffi::hs_person_delete_checked(id, std::ptr::null_mut()) };
    println!("deleting again returns code {} (double free)", code);

    handle_shim::shutdown()?;
    Ok(())
}
