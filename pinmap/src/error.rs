use crate::widget::CreateMapError;

/// Fatal problems with mounting the map.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("map container node is missing")]
    MissingContainer,

    #[error(transparent)]
    CreateMap(#[from] CreateMapError),
}
