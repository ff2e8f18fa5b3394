#[macro_use]
extern crate afl;
use quill::{DirectSession, Keypair, Pubkey};

fn get_session() -> DirectSession {
    let program_id = Pubkey::new_from_array([42u8; 32]);
    let victim = Keypair::from_seed(&[1u8; 32]);
    let attacker = Keypair::from_seed(&[2u8; 32]);

    DirectSession::new(&program_id, &victim, &attacker.pubkey()).expect("Setup failed")
}

fn main() {
    let session = get_session();

    fuzz!(|data: &[u8]| {
        let _ = session.decrypt(0, data);
    });
}
