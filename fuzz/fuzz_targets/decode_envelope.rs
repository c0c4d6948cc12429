#![no_main]

use capwd::{decode_envelope, Broker, MemorySource};
use capwd_lattice::Passwd;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = decode_envelope(data) else {
        return;
    };
    let broker = Broker::with_source(MemorySource::new(vec![
        Passwd::new("root", 0, 0).with_shell("/bin/sh"),
        Passwd::new("daemon", 1, 1),
    ]));
    let root = broker.open();
    let _ = broker.handle(root, envelope.request);
});
