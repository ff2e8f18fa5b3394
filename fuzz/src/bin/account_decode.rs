#[macro_use]
extern crate afl;
use quill::account;

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(decoded) = account::decode(data) {
            // Whatever decodes must encode back to a prefix of the input.
            let encoded = account::encode(&decoded).expect("decoded accounts encode");
            assert!(data.starts_with(&encoded));
        }
    });
}
