//! Release categorization.
//!
//! An ordered cascade of classifier stages, each a table of regex predicates
//! with exclusion patterns. Stage order is part of the behavior: misc/hash
//! detection runs before group-based assignment, which runs before the TV and
//! movie classifiers, and the first stage returning a category wins.

use regex::Regex;

use crate::types::Category;
use crate::{Error, Result};

/// Compiled classifier cascade. Pure function of (name, group).
pub struct Categorizer {
    misc_long_token: Regex,
    misc_all_caps: Regex,
    misc_hash: Regex,
    misc_exclude: Regex,

    anime_groups: Regex,

    tv: Regex,
    tv_exclude: Regex,
    tv_sports_hint: Regex,
    hdtv: Regex,
    sdtv_main: Regex,
    sdtv_x264: Regex,
    sdtv_episode: Regex,
    sdtv_source: Regex,
    webdl: Regex,
    other_tv: Regex,
    other_tv_episode: Regex,
    foreign_tv: Vec<Regex>,
    anime_tv: Regex,
    sport_tv_exclude: Regex,
    sport_tv: Vec<Regex>,
    documentary: Regex,

    movie: Regex,
    movie_exclude: Regex,
    movie_foreign: Vec<Regex>,
    movie_dvd: Regex,
    movie_sd: Regex,
    movie_3d: Regex,
    movie_bluray: Regex,
    movie_bluray_exclude: Regex,
    movie_hd: Regex,
    movie_other: Regex,
}

impl Categorizer {
    /// Compile the full predicate table
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::Other(format!("bad classifier pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            misc_long_token: compile(r"(?i)[a-z0-9]{20,}")?,
            misc_all_caps: compile(r"(?i)^[A-Z0-9]+$")?,
            misc_hash: compile(r"(?i)[a-f0-9]{32,64}")?,
            misc_exclude: compile(
                r"(?i)[^a-z0-9]((480|720|1080)[ip]|s\d{1,3}[-._ ]?[ed]\d{1,3}([ex]\d{1,3}|[-.\w ]))[^a-z0-9]",
            )?,

            anime_groups: compile(
                r"alt\.binaries\.(multimedia\.erotica\.|cartoons\.french\.|dvd\.|multimedia\.)?anime(\.highspeed|\.repost|s-fansub|\.german)?",
            )?,

            tv: compile(
                r"(?i)Daily[-_\.]Show|Nightly News|^\[[a-zA-Z\.\-]+\].*[-_].*\d{1,3}[-_. ]((\[|\()(h264-)?\d{3,4}(p|i)(\]|\))\s?(\[AAC\])?|\[[a-fA-F0-9]{8}\]|(8|10)BIT|hi10p)(\[[a-fA-F0-9]{8}\])?|(\d\d-){2}[12]\d{3}|[12]\d{3}(\.\d\d){2}|\d+x\d+|\.e\d{1,3}\.|s\d{1,3}[-._ ]?[ed]\d{1,3}([ex]\d{1,3}|[-.\w ])|[-._ ](\dx\d\d|C4TV|Complete[-._ ]Season|DSR|(D|H|P|S)DTV|EP[-._ ]?\d{1,3}|S\d{1,3}.+Extras|SUBPACK|Season[-._ ]\d{1,2})([-._ ]|$)|TVRIP|TV[-._ ](19|20)\d\d|TrollHD",
            )?,
            tv_exclude: compile(r"(?i)[-._ ](flac|imageset|mp3|xxx)[-._ ]|[ .]exe$")?,
            tv_sports_hint: compile(
                r"(?i)[-._ ]((19|20)\d\d[-._ ]\d{1,2}[-._ ]\d{1,2}[-._ ]VHSRip|Indy[-._ ]?Car|(iMPACT|Smoky[-._ ]Mountain|Texas)[-._ ]Wrestling|Moto[-._ ]?GP|NSCS[-._ ]ROUND|NECW[-._ ]TV|(Per|Post)\-Show|PPV|WrestleMania|WCW|WEB[-._ ]HD|WWE[-._ ](Monday|NXT|RAW|Smackdown|Superstars|WrestleMania))[-._ ]",
            )?,
            hdtv: compile(r"(?i)1080(i|p)|720p|bluray")?,
            sdtv_main: compile(
                r"(?i)(360|480|576)p|Complete[-._ ]Season|dvdr(ip)?|dvd5|dvd9|\.pdtv|SD[-._ ]TV|TVRip|NTSC|BDRip|hdtv|xvid",
            )?,
            sdtv_x264: compile(r"(?i)((H|P)D[-._ ]?TV|DSR|WebRip)[-._ ]x264")?,
            sdtv_episode: compile(r"(?i)s\d{1,3}[-._ ]?[ed]\d{1,3}([ex]\d{1,3}|[-.\w ])|\s\d{3,4}\s")?,
            sdtv_source: compile(r"(?i)(H|P)D[-._ ]?TV|BDRip[-._ ]x264")?,
            webdl: compile(r"(?i)web[-._ ]dl|web-?rip")?,
            other_tv: compile(r"(?i)[-._ ]S\d{1,3}.+(EP\d{1,3}|Extras|SUBPACK)[-._ ]|News")?,
            other_tv_episode: compile(r"(?i)[-._ ]s\d{1,3}[-._ ]?(e|d(isc)?)\d{1,3}([-._ ]|$)")?,
            foreign_tv: vec![
                compile(
                    r"(?i)[-._ ](chinese|dk|fin|french|ger?|heb|ita|jap|kor|nor|nordic|nl|pl|swe)[-._ ]?(sub|dub)(ed|bed|s)?|<German>",
                )?,
                compile(
                    r"(?i)[-._ ](brazilian|chinese|croatian|danish|deutsch|dutch|estonian|flemish|finnish|french|german|greek|hebrew|icelandic|italian|ita|latin|mandarin|nordic|norwegian|polish|portuguese|japenese|japanese|russian|serbian|slovenian|spanish|spanisch|swedish|thai|turkish).+(720p|1080p|Divx|DOKU|DUB(BED)?|DLMUX|NOVARIP|RealCo|Sub(bed|s)?|Web[-._ ]?Rip|WS|Xvid|x264)[-._ ]",
                )?,
                compile(
                    r"(?i)[-._ ](720p|1080p|Divx|DOKU|DUB(BED)?|DLMUX|NOVARIP|RealCo|Sub(bed|s)?|Web[-._ ]?Rip|WS|Xvid).+(brazilian|chinese|croatian|danish|deutsch|dutch|estonian|flemish|finnish|french|german|greek|hebrew|icelandic|italian|ita|latin|mandarin|nordic|norwegian|polish|portuguese|japenese|japanese|russian|serbian|slovenian|spanish|spanisch|swedish|thai|turkish)[-._ ]",
                )?,
                compile(
                    r"(?i)(S\d\d[EX]\d\d|DOCU(MENTAIRE)?|TV)?[-._ ](FRENCH|German|Dutch)[-._ ](720p|1080p|dv(b|d)r(ip)?|LD|HD\-?TV|TV[-._ ]?RIP|x264)[-._ ]",
                )?,
                compile(
                    r"(?i)[-._ ]FastSUB|NL|nlvlaams|patrfa|RealCO|Seizoen|slosinh|Videomann|Vostfr|xslidian[-._ ]|x264\-iZU",
                )?,
            ],
            anime_tv: compile(
                r"(?i)[-._ ]Anime[-._ ]|^\[[a-zA-Z\.\-]+\].*[-_].*\d{1,3}[-_. ]((\[|\()((\d{1,4}x\d{1,4})|(h264-)?\d{3,4}(p|i))(\]|\))\s?(\[AAC\])?|\[[a-fA-F0-9]{8}\]|(8|10)BIT|hi10p)(\[[a-fA-F0-9]{8}\])?",
            )?,
            sport_tv_exclude: compile(r"(?i)s\d{1,3}[-._ ]?[ed]\d{1,3}([ex]\d{1,3}|[-.\w ])")?,
            sport_tv: vec![
                compile(
                    r"(?i)[-._ ]?(Bellator|bundesliga|EPL|ESPN|FIA|la[-._ ]liga|MMA|motogp|NFL|NHL|NCAA|PGA|red[-._ ]bull.+race|Sengoku|Strikeforce|supercup|uefa|UFC|wtcc|WWE)[-._ ]",
                )?,
                compile(
                    r"(?i)[-._ ]?(AFL|Grand Prix|Indy[-._ ]Car|(iMPACT|Smoky[-._ ]Mountain|Texas)[-._ ]Wrestling|Moto[-._ ]?GP|NSCS[-._ ]ROUND|NECW|Poker|PWX|Rugby|WCW)[-._ ]",
                )?,
                compile(r"(?i)[-._ ]?(Horse)[-._ ]Racing[-._ ]")?,
            ],
            documentary: compile(r"(?i)[-._ ](Docu|Documentary)[-._ ]")?,

            movie: compile(
                r"(?i)[-._ ]AVC[-._ ]|[BH][DR]RIP|Bluray|BD[-._ ]?(25|50)?|\bBR\b|Camrip|[-._ ]\d{4}[-._ ].+(720p|1080p|Cam|HDTS)|DIVX|[-._ ]DVD[-._ ]|DVD-?(5|9|R|Rip)|Untouched|VHSRip|XVID|[-._ ](DTS|TVrip)[-._ ]",
            )?,
            movie_exclude: compile(
                r"(?i)auto(cad|desk)|divx[-._ ]plus|[-._ ]exe$|[-._ ](jav|XXX)[-._ ]|SWE6RUS|\wXXX(1080p|720p|DVD)|Xilisoft",
            )?,
            movie_foreign: vec![
                compile(
                    r"(?i)(danish|flemish|Deutsch|dutch|french|german|heb|hebrew|Castellano|nl[-._ ]?sub|dub(bed|s)?|\.NL|norwegian|swedish|swesub|spanish|Staffel)[-._ ]|\(german\)|Multisub",
                )?,
                compile(
                    r"(?i)(720p|1080p|AC3|AVC|DIVX|DVD(5|9|RIP|R)|XVID)[-._ ](Dutch|French|German|ITA)|\(?(Dutch|French|German|ITA)\)?[-._ ](720P|1080p|AC3|AVC|DIVX|DVD(5|9|RIP|R)|HD[-._ ]|XVID)",
                )?,
            ],
            movie_dvd: compile(r"(?i)(dvd\-?r|[-._ ]dvd|dvd9|dvd5|[-._ ]r5)[-._ ]")?,
            movie_sd: compile(r"(?i)(divx|dvdscr|extrascene|dvdrip|\.CAM|HDTS(-LINE)?|vhsrip|xvid(vd)?)[-._ ]")?,
            movie_3d: compile(
                r"(?i)[-._ ]3D\s?[\.\-_\[ ](1080p|(19|20)\d\d|AVC|BD(25|50)|Blu[-._ ]?ray|CEE|Complete|GER|MVC|MULTi|SBS|H(-)?SBS)[-._ ]",
            )?,
            movie_bluray: compile(
                r"(?i)bluray\-|[-._ ]bd?[-._ ]?(25|50)|blu-ray|Bluray\s\-\sUntouched|[-._ ]untouched[-._ ]",
            )?,
            movie_bluray_exclude: compile(r"(?i)SecretUsenet\.com")?,
            movie_hd: compile(r"(?i)720p|1080p|AVC|VC1|VC\-1|web\-dl|wmvhd|x264|XvidHD|bdrip")?,
            movie_other: compile(r"(?i)[-._ ]cam[-._ ]")?,
        })
    }

    /// Classify a release name in its destination group
    pub fn categorize(&self, name: &str, group: &str) -> Category {
        let stages = [
            Self::is_misc,
            Self::category_from_group,
            Self::is_tv,
            Self::is_movie,
        ];
        for stage in stages {
            let category = stage(self, name, group);
            if category != Category::Unknown {
                return category;
            }
        }
        Category::Unknown
    }

    fn is_misc(&self, name: &str, _group: &str) -> Category {
        if self.misc_exclude.is_match(name) {
            return Category::Unknown;
        }
        if self.misc_hash.is_match(name) {
            return Category::OtherHashed;
        }
        if self.misc_long_token.is_match(name) || self.misc_all_caps.is_match(name) {
            return Category::OtherMisc;
        }
        Category::Unknown
    }

    fn category_from_group(&self, name: &str, group: &str) -> Category {
        if group == "alt.binaries.audio.warez" {
            return Category::Pc0day;
        }
        if self.anime_groups.is_match(group) {
            return Category::TvAnime;
        }
        if group == "alt.binaries.moovee" {
            // Episodic content crossposted here still categorizes as TV
            let tv = self.is_tv(name, group);
            if tv != Category::Unknown {
                return tv;
            }
            let hd = self.is_movie_hd(name);
            if hd != Category::Unknown {
                return hd;
            }
            return Category::MovieSd;
        }
        Category::Unknown
    }

    fn is_tv(&self, name: &str, group: &str) -> Category {
        if self.tv.is_match(name) && !self.tv_exclude.is_match(name) {
            let classifiers = [
                Self::is_other_tv,
                Self::is_foreign_tv,
                Self::is_sport_tv,
                Self::is_documentary_tv,
                Self::is_tv_webdl,
                Self::is_anime_tv,
                Self::is_hdtv,
                Self::is_sdtv,
                Self::is_other_tv_episode,
            ];
            for classifier in classifiers {
                let category = classifier(self, name, group);
                if category != Category::Unknown {
                    return category;
                }
            }
            return Category::TvOther;
        }

        if self.tv_sports_hint.is_match(name) {
            if self.is_sport_tv(name, group) != Category::Unknown {
                return Category::TvSport;
            }
            return Category::TvOther;
        }
        Category::Unknown
    }

    fn is_hdtv(&self, name: &str, _group: &str) -> Category {
        if self.hdtv.is_match(name) {
            return Category::TvHd;
        }
        Category::Unknown
    }

    fn is_sdtv(&self, name: &str, _group: &str) -> Category {
        if self.sdtv_main.is_match(name) || self.sdtv_x264.is_match(name) {
            return Category::TvSd;
        }
        if self.sdtv_episode.is_match(name) && self.sdtv_source.is_match(name) {
            return Category::TvSd;
        }
        Category::Unknown
    }

    fn is_tv_webdl(&self, name: &str, _group: &str) -> Category {
        if self.webdl.is_match(name) {
            return Category::TvWebDl;
        }
        Category::Unknown
    }

    fn is_other_tv(&self, name: &str, _group: &str) -> Category {
        if self.other_tv.is_match(name) {
            return Category::TvOther;
        }
        Category::Unknown
    }

    fn is_other_tv_episode(&self, name: &str, _group: &str) -> Category {
        if self.other_tv_episode.is_match(name) {
            return Category::TvOther;
        }
        Category::Unknown
    }

    fn is_foreign_tv(&self, name: &str, _group: &str) -> Category {
        if self.foreign_tv.iter().any(|re| re.is_match(name)) {
            return Category::TvForeign;
        }
        Category::Unknown
    }

    fn is_anime_tv(&self, name: &str, _group: &str) -> Category {
        if self.anime_tv.is_match(name) {
            return Category::TvAnime;
        }
        Category::Unknown
    }

    fn is_sport_tv(&self, name: &str, _group: &str) -> Category {
        // Episode markers disqualify sports outright
        if self.sport_tv_exclude.is_match(name) {
            return Category::Unknown;
        }
        if self.sport_tv.iter().any(|re| re.is_match(name)) {
            return Category::TvSport;
        }
        Category::Unknown
    }

    fn is_documentary_tv(&self, name: &str, _group: &str) -> Category {
        if self.documentary.is_match(name) {
            return Category::TvDocumentary;
        }
        Category::Unknown
    }

    fn is_movie(&self, name: &str, _group: &str) -> Category {
        if !self.movie.is_match(name) || self.movie_exclude.is_match(name) {
            return Category::Unknown;
        }
        if self.movie_foreign.iter().any(|re| re.is_match(name)) {
            return Category::MovieForeign;
        }
        if self.movie_dvd.is_match(name) {
            return Category::MovieDvd;
        }
        if self.webdl.is_match(name) {
            return Category::MovieWebDl;
        }
        if self.movie_sd.is_match(name) {
            return Category::MovieSd;
        }
        if self.movie_3d.is_match(name) {
            return Category::Movie3d;
        }
        if self.movie_bluray.is_match(name) && !self.movie_bluray_exclude.is_match(name) {
            return Category::MovieBluRay;
        }
        let hd = self.is_movie_hd(name);
        if hd != Category::Unknown {
            return hd;
        }
        if self.movie_other.is_match(name) {
            return Category::MovieOther;
        }
        Category::Unknown
    }

    fn is_movie_hd(&self, name: &str) -> Category {
        if self.movie_hd.is_match(name) {
            return Category::MovieHd;
        }
        Category::Unknown
    }
}
