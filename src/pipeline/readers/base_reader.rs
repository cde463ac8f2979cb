use crate::data_model::NormalizedInput;
use crate::error::Result;

pub trait BaseReader {
    fn read_inputs(&self) -> Result<Box<dyn Iterator<Item = Result<NormalizedInput>>>>;
}
