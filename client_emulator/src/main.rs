use anyhow::{bail, Context};
use clap::Parser;
use protocol::{ClientPacket, ServerPacket, CODE_LEN};
use rand::seq::SliceRandom;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const GENETIC_ALPHABET: &[u8] = b"UGCA";

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Player id to authenticate as
    player_id: u16,
    /// Game server address
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Game server port
    #[clap(short, long, default_value = "5481")]
    port: u16,
    /// Infection attempts to send, as a multiple of the network size
    #[clap(short, long, default_value = "1")]
    rounds: usize,
}

struct Connection {
    socket: TcpStream,
    static_buffer: [u8; 1024],
    input_buffer: Vec<u8>,
}

impl Connection {
    fn new(socket: TcpStream) -> Connection {
        Connection {
            socket,
            static_buffer: [0; 1024],
            input_buffer: Vec::new(),
        }
    }

    async fn send(&mut self, packet: &ClientPacket) -> anyhow::Result<()> {
        let mut output_buffer = Vec::new();
        packet.pack(&mut output_buffer);
        self.socket.write_all(&output_buffer).await?;
        Ok(())
    }

    async fn read_packet(&mut self) -> anyhow::Result<ServerPacket> {
        loop {
            if let Some((consumed, decoded)) = ServerPacket::dequeue_and_decode(&self.input_buffer) {
                let packet = decoded?;
                self.input_buffer.drain(..consumed);
                return Ok(packet);
            }
            let len = self.socket.read(&mut self.static_buffer).await?;
            if len == 0 {
                bail!("server closed the connection");
            }
            self.input_buffer.extend(&self.static_buffer[..len]);
        }
    }
}

fn random_code() -> [u8; CODE_LEN] {
    let mut rng = rand::thread_rng();
    let mut code = [0u8; CODE_LEN];
    for byte in code.iter_mut() {
        *byte = *GENETIC_ALPHABET.choose(&mut rng).expect("empty alphabet");
    }
    code
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let socket = TcpStream::connect((args.host.as_str(), args.port))
        .await
        .context("could not reach the game server")?;
    let mut connection = Connection::new(socket);

    connection.send(&ClientPacket::Auth { player_id: args.player_id }).await?;
    let network_size = match connection.read_packet().await {
        Ok(ServerPacket::NetworkSizeAnnouncement { network_size }) => network_size as usize,
        Ok(packet) => bail!("unexpected packet after authentication: {packet:?}"),
        Err(e) => bail!("authentication refused: {e}"),
    };
    println!("authenticated, the network has {network_size} nodes");

    for attempt in 0..args.rounds * network_size {
        let code = random_code();
        connection.send(&ClientPacket::Infection { code }).await?;
        match connection.read_packet().await? {
            ServerPacket::ResultInfection { prior_score, success } => {
                println!(
                    "generation {} ({prior_score}/{network_size}): infection {}",
                    attempt + 1,
                    if success { "succeeded" } else { "failed" }
                );
            }
            ServerPacket::MaximumInfection { prior_score } => {
                println!("all {prior_score} nodes are already infected, stopping");
                break;
            }
            packet => bail!("unexpected infection response: {packet:?}"),
        }
    }

    connection.send(&ClientPacket::Disconnection).await?;
    println!("infection process finished");
    Ok(())
}
