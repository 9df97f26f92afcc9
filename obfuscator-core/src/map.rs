use crate::lumps::FileHeader;
use crate::records::{decode_lump, BrushSide, StringTable, TexData, TexInfo};
use crate::{ObfuscatorError, Result};

/// The parts of a map file the rewrite needs, decoded once and then only read.
#[derive(Debug, Clone)]
pub struct BspMap {
    pub header: FileHeader,
    pub tex_infos: Vec<TexInfo>,
    pub tex_datas: Vec<TexData>,
    pub strings: StringTable,
    pub brush_sides: Vec<BrushSide>,
}

impl BspMap {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = FileHeader::parse(data)?;
        let tex_infos = decode_lump::<TexInfo>(data, &header)?;
        let tex_datas = decode_lump::<TexData>(data, &header)?;
        let strings = StringTable::decode(data, &header)?;
        let brush_sides = decode_lump::<BrushSide>(data, &header)?;

        log::debug!(
            "VBSP v{} rev {}: {} texinfo, {} texdata, {} names, {} brush sides",
            header.version,
            header.map_revision,
            tex_infos.len(),
            tex_datas.len(),
            strings.len(),
            brush_sides.len()
        );

        Ok(Self {
            header,
            tex_infos,
            tex_datas,
            strings,
            brush_sides,
        })
    }

    pub fn tex_info(&self, index: i64) -> Result<&TexInfo> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.tex_infos.get(i))
            .ok_or(ObfuscatorError::CorruptReference {
                what: "texinfo index",
                index,
                len: self.tex_infos.len(),
            })
    }

    pub fn tex_data_of(&self, info: &TexInfo) -> Result<&TexData> {
        usize::try_from(info.tex_data)
            .ok()
            .and_then(|i| self.tex_datas.get(i))
            .ok_or(ObfuscatorError::CorruptReference {
                what: "texdata index",
                index: info.tex_data as i64,
                len: self.tex_datas.len(),
            })
    }

    /// String-table id and name of the texture a texinfo points at.
    pub fn texture_name(&self, tex_info: usize) -> Result<(i32, String)> {
        let info = self.tex_info(tex_info as i64)?;
        let data = self.tex_data_of(info)?;
        let name = self.strings.string_at(data.name_string_table_id)?;
        Ok((data.name_string_table_id, name))
    }
}
