#![deny(rust_2018_idioms)]
#![no_main]

use libfuzzer_sys::fuzz_target;
use xmlref::Event;

fuzz_target!(|s: String| {
    if let Ok(events) = xmlref::tokenize(&s) {
        assert_eq!(events.last(), Some(&Event::Eof));
        assert_eq!(events.iter().filter(|e| **e == Event::Eof).count(), 1);

        let prolog = events.iter().take_while(|e| e.is_prolog()).count();
        assert!(events[prolog..].iter().all(|e| !e.is_prolog()));
    }
});
