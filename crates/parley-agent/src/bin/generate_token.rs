//! Mints a LiveKit access token for manual testing.

use parley_agent::{
    init_tracing, mint_token, prompt_with_default, token_banner, DEFAULT_IDENTITY, DEFAULT_ROOM,
};
use parley_voice::LiveKitConfig;
use std::io;

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let answers = prompt_with_default(&mut input, &mut output, "Enter room name", DEFAULT_ROOM)
        .and_then(|room| {
            prompt_with_default(
                &mut input,
                &mut output,
                "Enter participant identity",
                DEFAULT_IDENTITY,
            )
            .map(|identity| (room, identity))
        });

    let (room_name, identity) = match answers {
        Ok(answers) => answers,
        Err(e) => {
            tracing::error!(error = %e, "failed to read input");
            std::process::exit(1);
        }
    };

    let token = LiveKitConfig::from_env()
        .and_then(|config| mint_token(config, &room_name, &identity));

    match token {
        Ok(token) => print!("{}", token_banner(&room_name, &identity, &token)),
        Err(e) => {
            tracing::error!(error = %e, "failed to generate token");
            std::process::exit(1);
        }
    }
}
