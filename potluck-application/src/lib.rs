#![warn(clippy::uninlined_format_args)]

pub mod dto;
pub mod error;
pub mod event_manager;
pub mod mapper;
pub mod ports;
pub mod report;

pub use dto::{
    CategoryDto, DebtDto, EventDto, EventResultDto, EventSummaryDto, ParticipantDto,
    ParticipantResultDto,
};
pub use error::ApplicationError;
pub use event_manager::EventManager;
pub use mapper::EventMapper;
pub use ports::NameDirectory;
pub use report::{DebtLine, ParticipantLine, SettlementReport};
