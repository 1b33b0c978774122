// Domain layer: match entities, pure rules, and ports.

pub mod board;
pub mod deadline;
pub mod directory;
pub mod errors;
pub mod fleet;
pub mod grid;
pub mod ports;
pub mod presence;
pub mod room;

pub use board::{Board, BoardSnapshot, Mark, OwnBoard, Settlement, Shot, ShotOutcome, ShotReceipt};
pub use deadline::{Deadline, DeadlineClock, Tick};
pub use directory::{DirectoryError, SeatDirectory};
pub use errors::{IllegalAction, MatchError, ServiceError};
pub use fleet::{Fleet, PlacedShip, PlacementError, ShipClass, ShipLayout};
pub use grid::{Coordinate, GRID_SIZE, Grid, Orientation, fits, preview_cells};
pub use ports::{Clock, MatchService};
pub use presence::{PresenceChange, PresenceSignal, PresenceTracker};
pub use room::{Participant, Phase, RoomJoined, RoomOptions, RoomSnapshot, Seat, SeatPatch};
