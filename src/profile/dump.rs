//! Bytecode listings annotated with inline-cache statuses

use super::ProfiledBlock;
use crate::bytecode::Instruction;
use crate::error::{Error, Result, SiteLocation};
use crate::status::{CallLinkStatus, GetByIdStatus, PutByIdStatus, ResolveGlobalStatus};

impl<'a> ProfiledBlock<'a> {
    /// Render every instruction in bytecode order with its classification
    pub fn dump_statuses(&self) -> String {
        let mut output = format!("== {} ==\n", self.name());
        for (index, instruction) in self.profile().instructions() {
            output.push_str(&self.dump_instruction(index, instruction));
            output.push('\n');
        }
        output
    }

    /// Render a single site
    pub fn dump_site(&self, bytecode_index: u32) -> Result<String> {
        let instruction = self.instruction(bytecode_index).ok_or_else(|| {
            Error::UnknownInstruction(SiteLocation::new(self.name(), bytecode_index))
        })?;
        Ok(self.dump_instruction(bytecode_index, instruction))
    }

    fn dump_instruction(&self, index: u32, instruction: &Instruction) -> String {
        let status = match instruction {
            Instruction::GetById { identifier, .. } | Instruction::GetArrayLength { identifier } => {
                GetByIdStatus::compute_for(self, index, identifier).to_string()
            }
            Instruction::PutById {
                identifier, direct, ..
            } => {
                let status = PutByIdStatus::compute_for(self, index, identifier);
                if status.transition_is_still_valid(self.heap(), *direct) {
                    status.to_string()
                } else {
                    format!("{}, chain invalidated", status)
                }
            }
            Instruction::Call { .. } => CallLinkStatus::compute_for(self, index).to_string(),
            Instruction::Resolve {
                identifier,
                operations,
            } => match operations.last() {
                Some(operation) => {
                    ResolveGlobalStatus::compute_for(self, index, operation, identifier).to_string()
                }
                None => ResolveGlobalStatus::default().to_string(),
            },
        };
        format!("[{:4}] {:<40} status({})", index, instruction.to_string(), status)
    }
}
