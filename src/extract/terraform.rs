use super::{AffectedResource, CommandContext, ResourceParser};
use crate::parse;

const TARGET_FLAGS: &[&str] = &["-target", "--target"];

pub struct TerraformParser;

impl ResourceParser for TerraformParser {
    fn extract(&self, ctx: &CommandContext) -> Vec<AffectedResource> {
        parse::flag_values(ctx.args(), TARGET_FLAGS)
            .into_iter()
            .map(|target| {
                AffectedResource::new("terraform_resource", target).with_provider("terraform")
            })
            .collect()
    }
}
