//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件，如节点、链路、缓冲区、数据包和网络拓扑。

// 子模块声明
mod id;
mod packet;
mod buffer;
mod link;
mod tracker;
mod routing;
mod node;
mod stats;
mod network;
mod deliver_packet;
mod link_ready;
mod routing_update;
mod net_world;

// 重新导出公共接口
pub use id::{FlowId, LinkId, NodeId};
pub use packet::{Packet, PacketKind, ACK_BYTES, PAYLOAD_BYTES, ROUTING_BYTES};
pub use buffer::Buffer;
pub use link::{Direction, Link};
pub use tracker::PacketTracker;
pub use routing::{RouteEntry, RouteUpdate, RoutingTable};
pub use node::{Host, Node, Router};
pub use stats::Stats;
pub use network::Network;
pub use deliver_packet::DeliverPacket;
pub use link_ready::LinkReady;
pub use routing_update::RoutingUpdate;
pub use net_world::NetWorld;
