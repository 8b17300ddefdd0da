pub mod command;
pub mod packet;

pub use command::{ChatCommand, ChatLine, ChatLineParseError};
pub use packet::{EventCode, PACKET_SEPARATOR, PacketParseError, SocketPacket};
