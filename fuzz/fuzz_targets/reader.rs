#![no_main]

use libfuzzer_sys::fuzz_target;
use xjconf::{Event, Reader};

fuzz_target!(|data: &[u8]| {
    let mut events: Vec<Event> = Vec::new();
    let _ = Reader::new(data).read(&mut events);
});
