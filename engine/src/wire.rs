// wire.rs - newline-delimited JSON frames over a byte stream
//
// -> {"id":7,"request":{"op":"Start","args":{"params":{...},"world":{...}}}}
// -> {"id":8,"request":{"op":"GetAliveCells"}}
// <- {"id":8,"result":{"Ok":{"AliveCells":{"completed_turns":12,"alive_count":40}}}}
// <- {"id":7,"result":{"Ok":{"World":{...}}}}
//
// Requests on one connection run concurrently, so replies carry the id of
// the request they answer and may come back in any order.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::EngineError;
use crate::grid::Grid;
use crate::params::{Progress, RunParameters};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args")]
pub enum Request {
    IsAlreadyRunning(RunParameters),
    Start { params: RunParameters, world: Grid },
    Continue,
    Save,
    Pause,
    Execute,
    Quit,
    GetAliveCells,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::IsAlreadyRunning(_) => "IsAlreadyRunning",
            Request::Start { .. } => "Start",
            Request::Continue => "Continue",
            Request::Save => "Save",
            Request::Pause => "Pause",
            Request::Execute => "Execute",
            Request::Quit => "Quit",
            Request::GetAliveCells => "GetAliveCells",
        }
    }
}

/// Turn count and grid as returned by Save, Pause and Execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReply {
    pub completed_turns: u64,
    pub world: Grid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Running(bool),
    World(Grid),
    Snapshot(SaveReply),
    Turns(u64),
    AliveCells(Progress),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub request: Request,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: u64,
    pub result: Result<Reply, EngineError>,
}

/// Just enough of a frame to address an error reply to it.
#[derive(Deserialize)]
struct FrameId {
    id: u64,
}

/// Best-effort id of a frame that failed to decode; 0 when none is readable.
pub fn recover_id(line: &str) -> u64 {
    serde_json::from_str::<FrameId>(line).map_or(0, |f| f.id)
}

/// Writes one frame followed by a newline and flushes.
pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line)
}
